pub mod app_behaviour;
pub mod app_role;
pub mod handlers;
pub mod long_memory;

use std::sync::Arc;

use crate::adapters::http::HttpClient;
use crate::app::app_behaviour::AppBehaviourBO;
use crate::app::app_role::AppRoleBO;
use crate::app::long_memory::UserLongTermMemoryBO;
use crate::config::lambda::RuntimeConfig;
use crate::core::parameters::CachedParameters;
use crate::core::table::Table;
use crate::domain::ports::{KeyValueStore, ParameterStore};
use crate::utils::cache::MemoCache;
use crate::utils::error::Result;

/// Collaborators shared by every handler of a process.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn KeyValueStore>,
    pub parameters: Arc<dyn ParameterStore>,
    pub http: HttpClient,
    pub runtime: RuntimeConfig,
}

impl Services {
    /// Wraps `parameters` in a memo sized and timed by `runtime`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        parameters: Arc<dyn ParameterStore>,
        runtime: RuntimeConfig,
    ) -> Result<Self> {
        let http = runtime.http_client()?;
        let parameters = Arc::new(CachedParameters::new(
            parameters,
            runtime.cache_capacity,
            runtime.parameter_cache_ttl(),
        ));

        Ok(Self {
            store,
            parameters,
            http,
            runtime,
        })
    }

    pub fn table(&self, name: impl Into<String>) -> Table {
        Table::new(name, self.store.clone())
    }

    pub fn app_behaviour_bo(&self, table_name: impl Into<String>) -> AppBehaviourBO {
        AppBehaviourBO::new(
            self.table(table_name),
            self.http.clone(),
            MemoCache::new(self.runtime.cache_capacity, self.runtime.source_cache_ttl()),
        )
    }

    pub fn app_role_bo(&self, table_name: impl Into<String>) -> AppRoleBO {
        AppRoleBO::new(
            self.table(table_name),
            self.http.clone(),
            MemoCache::new(self.runtime.cache_capacity, self.runtime.source_cache_ttl()),
        )
    }

    pub fn memory_bo(&self, table_name: impl Into<String>) -> UserLongTermMemoryBO {
        UserLongTermMemoryBO::new(
            self.table(table_name),
            MemoCache::new(self.runtime.cache_capacity, self.runtime.memory_cache_ttl()),
        )
    }
}
