//! Retrieves an application's behaviour and the user's long-term memory and
//! publishes them together with the incoming payload.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::app::app_behaviour::AppBehaviourBO;
use crate::app::long_memory::UserLongTermMemoryBO;
use crate::app::Services;
use crate::config::lambda::get_env_var;
use crate::domain::ports::{EventPublisher, Handler};
use crate::domain::topology::env;
use crate::utils::error::{KnowledgeError, Result};
use crate::utils::validation::require_str;

pub const DETAIL_TYPE: &str = "ContextRetrieved";

pub struct ContextRetriever {
    behaviours: AppBehaviourBO,
    memories: UserLongTermMemoryBO,
    publisher: Arc<dyn EventPublisher>,
}

impl ContextRetriever {
    pub fn new(
        behaviours: AppBehaviourBO,
        memories: UserLongTermMemoryBO,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            behaviours,
            memories,
            publisher,
        }
    }

    pub fn from_env(services: &Services, publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        let behaviour_table = get_env_var(env::APP_BEHAVIOUR_TABLE_NAME)?;
        let memory_table = get_env_var(env::USER_LONG_TERM_MEMORY_TABLE_NAME)?;

        Ok(Self::new(
            services.app_behaviour_bo(behaviour_table),
            services.memory_bo(memory_table),
            publisher,
        ))
    }
}

#[async_trait]
impl Handler for ContextRetriever {
    fn name(&self) -> &'static str {
        "context_retriever"
    }

    async fn handle(&self, body: Map<String, Value>) -> Result<Value> {
        let app_id = require_str(&body, "app_id")?;

        let app_behaviour = self
            .behaviours
            .get_behaviour_content(app_id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound {
                entity: "AppBehaviour".to_string(),
                key: "app_id".to_string(),
                value: app_id.to_string(),
                hint: format!(
                    ".\nYou must add it in the table `{}`",
                    self.behaviours.table_name()
                ),
            })?;

        let user_id = require_str(&body, "cbf_user_uuid")?;
        let last_memory = self
            .memories
            .get_last_memory(user_id)
            .await?
            .map(|memory| Value::String(memory.memory))
            .unwrap_or(Value::Null);

        let mut payload = body.clone();
        payload.insert("app_behaviour".to_string(), Value::String(app_behaviour));
        payload.insert("user_long_term_memory".to_string(), last_memory);
        let payload = Value::Object(payload);

        self.publisher.publish(DETAIL_TYPE, &payload).await?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::HttpClient;
    use crate::adapters::memory::{InMemoryStore, RecordingPublisher};
    use crate::core::table::Table;
    use crate::domain::model::{AppBehaviour, UserLongTermMemory};
    use crate::domain::topology;
    use crate::utils::cache::MemoCache;
    use serde_json::json;

    fn retriever(store: &InMemoryStore, publisher: &RecordingPublisher) -> ContextRetriever {
        let store = Arc::new(store.clone());
        ContextRetriever::new(
            AppBehaviourBO::new(
                Table::new("behaviours", store.clone()),
                HttpClient::default(),
                MemoCache::default(),
            ),
            UserLongTermMemoryBO::new(Table::new("memories", store), MemoCache::default()),
            Arc::new(publisher.clone()),
        )
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .create_table_from_spec("behaviours", &topology::app_behaviour_table())
            .unwrap();
        store
            .create_table_from_spec("memories", &topology::user_long_term_memory_table())
            .unwrap();
        store
            .insert(
                "behaviours",
                AppBehaviour {
                    app_id: "app-1".to_string(),
                    behaviour_source: "Be concise.".to_string(),
                }
                .to_record(),
            )
            .unwrap();
        store
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_context_is_merged_and_published() {
        let store = seeded_store();
        store
            .insert(
                "memories",
                UserLongTermMemory {
                    user_id: "u1".to_string(),
                    timestamp: 10,
                    memory: "Knows Rust.".to_string(),
                }
                .to_record(),
            )
            .unwrap();
        let publisher = RecordingPublisher::new();

        let output = retriever(&store, &publisher)
            .handle(body(json!({"app_id": "app-1", "cbf_user_uuid": "u1", "text": "hi"})))
            .await
            .unwrap();

        let expected = json!({
            "app_id": "app-1",
            "cbf_user_uuid": "u1",
            "text": "hi",
            "app_behaviour": "Be concise.",
            "user_long_term_memory": "Knows Rust."
        });
        assert_eq!(output, expected);

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detail_type, "ContextRetrieved");
        assert_eq!(events[0].message, expected);
    }

    #[tokio::test]
    async fn test_user_without_memory_gets_null() {
        let publisher = RecordingPublisher::new();
        let output = retriever(&seeded_store(), &publisher)
            .handle(body(json!({"app_id": "app-1", "cbf_user_uuid": "new-user"})))
            .await
            .unwrap();

        assert_eq!(output["user_long_term_memory"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_app_names_the_table() {
        let publisher = RecordingPublisher::new();
        let err = retriever(&seeded_store(), &publisher)
            .handle(body(json!({"app_id": "ghost", "cbf_user_uuid": "u1"})))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "AppBehaviour not found for app_id: ghost.\nYou must add it in the table `behaviours`"
        );
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_required_fields() {
        let publisher = RecordingPublisher::new();
        let handler = retriever(&seeded_store(), &publisher);

        let err = handler.handle(body(json!({}))).await.unwrap_err();
        assert_eq!(err.to_string(), "app_id is required");

        let err = handler
            .handle(body(json!({"app_id": "app-1"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cbf_user_uuid is required");
        assert!(publisher.events().is_empty());
    }
}
