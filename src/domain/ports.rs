use crate::domain::model::Record;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Single-table key-value access.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Every row of the partition.
    async fn get_by_partition_key(
        &self,
        table: &str,
        pk_name: &str,
        pk_value: &str,
    ) -> Result<Vec<Record>>;

    /// The `k` rows of the partition with the greatest sort key, newest first.
    async fn get_last_items_by_key(
        &self,
        table: &str,
        key_name: &str,
        key_value: &str,
        k: usize,
    ) -> Result<Vec<Record>>;

    async fn add_item(&self, table: &str, record: Record) -> Result<()>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, detail_type: &str, message: &Value) -> Result<()>;
}

#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// One unit of request processing over a JSON object body.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, body: Map<String, Value>) -> Result<Value>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn handle(&self, body: Map<String, Value>) -> Result<Value> {
        (**self).handle(body).await
    }
}
