//! Offline fixtures for running handlers without AWS.
//!
//! ```json
//! {
//!   "environment": {"APP_ROLE_TABLE_NAME": "roles"},
//!   "tables": [
//!     {"name": "roles", "partition_key": "app_id", "items": [{"app_id": "a", "role_source": "https://..."}]}
//!   ],
//!   "parameters": {"/global/NewAIJobAPIURL": "http://localhost:9000/jobs"}
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapters::memory::{InMemoryStore, RecordingPublisher, StaticParameters};
use crate::app::Services;
use crate::config::lambda::RuntimeConfig;
use crate::domain::model::Record;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableFixture {
    pub name: String,
    pub partition_key: String,
    #[serde(default)]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub items: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub tables: Vec<TableFixture>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// In-memory collaborators seeded from fixtures.
pub struct OfflineServices {
    pub services: Services,
    pub store: InMemoryStore,
    pub publisher: RecordingPublisher,
}

impl Fixtures {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let fixtures: Fixtures = serde_json::from_str(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            tables = fixtures.tables.len(),
            parameters = fixtures.parameters.len(),
            "Fixtures loaded"
        );
        Ok(fixtures)
    }

    /// Exports `environment` into the process environment.
    pub fn apply_environment(&self) {
        for (name, value) in &self.environment {
            std::env::set_var(name, value);
        }
    }

    pub fn store(&self) -> Result<InMemoryStore> {
        let store = InMemoryStore::new();
        for table in &self.tables {
            store.create_table(&table.name, &table.partition_key, table.sort_key.as_deref())?;
            for item in &table.items {
                store.insert(&table.name, Record::from(item.clone()))?;
            }
        }
        Ok(store)
    }

    pub fn parameters(&self) -> StaticParameters {
        StaticParameters::new(self.parameters.clone())
    }

    /// Applies the environment and builds services over in-memory adapters.
    pub fn offline_services(&self) -> Result<OfflineServices> {
        self.validate()?;
        self.apply_environment();
        let runtime = RuntimeConfig::from_env()?;

        let store = self.store()?;
        let services = Services::new(
            Arc::new(store.clone()),
            Arc::new(self.parameters()),
            runtime,
        )?;

        Ok(OfflineServices {
            services,
            store,
            publisher: RecordingPublisher::new(),
        })
    }
}

impl Validate for Fixtures {
    fn validate(&self) -> Result<()> {
        for table in &self.tables {
            validate_non_empty_string("tables.name", &table.name)?;
            validate_non_empty_string("tables.partition_key", &table.partition_key)?;
        }
        for name in self.environment.keys() {
            validate_non_empty_string("environment", name)?;
        }
        Ok(())
    }
}
