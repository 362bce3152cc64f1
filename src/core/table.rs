use std::sync::Arc;

use crate::domain::model::Record;
use crate::domain::ports::KeyValueStore;
use crate::utils::error::Result;

/// A store bound to one table name.
#[derive(Clone)]
pub struct Table {
    name: String,
    store: Arc<dyn KeyValueStore>,
}

impl Table {
    pub fn new(name: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get_by_partition_key(&self, pk_name: &str, pk_value: &str) -> Result<Vec<Record>> {
        self.store
            .get_by_partition_key(&self.name, pk_name, pk_value)
            .await
    }

    pub async fn get_last_items_by_key(
        &self,
        key_name: &str,
        key_value: &str,
        k: usize,
    ) -> Result<Vec<Record>> {
        self.store
            .get_last_items_by_key(&self.name, key_name, key_value, k)
            .await
    }

    pub async fn add(&self, record: Record) -> Result<()> {
        self.store.add_item(&self.name, record).await
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}
