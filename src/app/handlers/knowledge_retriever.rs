use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::app::app_role::AppRoleBO;
use crate::app::Services;
use crate::config::lambda::get_env_var;
use crate::domain::ports::{EventPublisher, Handler};
use crate::domain::topology::env;
use crate::utils::error::{KnowledgeError, Result};
use crate::utils::validation::require_str;

pub const DETAIL_TYPE: &str = "KnowledgeRetrieved";

/// Adds the application's role document to the payload and publishes it.
pub struct KnowledgeRetriever {
    roles: AppRoleBO,
    publisher: Arc<dyn EventPublisher>,
}

impl KnowledgeRetriever {
    pub fn new(roles: AppRoleBO, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { roles, publisher }
    }

    pub fn from_env(services: &Services, publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        let role_table = get_env_var(env::APP_ROLE_TABLE_NAME)?;
        Ok(Self::new(services.app_role_bo(role_table), publisher))
    }
}

#[async_trait]
impl Handler for KnowledgeRetriever {
    fn name(&self) -> &'static str {
        "knowledge_retriever"
    }

    async fn handle(&self, body: Map<String, Value>) -> Result<Value> {
        let app_id = require_str(&body, "app_id")?;

        let app_role = self
            .roles
            .get_role_content(app_id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound {
                entity: "AppRole".to_string(),
                key: "app_id".to_string(),
                value: app_id.to_string(),
                hint: String::new(),
            })?;

        let mut payload = body.clone();
        payload.insert("app_role".to_string(), Value::String(app_role));
        let payload = Value::Object(payload);

        self.publisher.publish(DETAIL_TYPE, &payload).await?;
        Ok(payload)
    }
}
