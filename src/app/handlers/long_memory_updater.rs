//! Folds the latest exchange of a conversation into the user's long-term
//! memory through the AI job service.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::adapters::http::HttpClient;
use crate::app::long_memory::UserLongTermMemoryBO;
use crate::app::Services;
use crate::config::lambda::get_env_var;
use crate::domain::model::AiJob;
use crate::domain::ports::{Handler, ParameterStore};
use crate::domain::topology::env;
use crate::utils::error::{KnowledgeError, Result};
use crate::utils::validation::require_str;

const ASSISTANT_BEHAVIOUR: &str = r#"You are an AI assistant responsible for maintaining a concise and accurate summary of a conversation.
The summary should include only essential facts, unresolved issues, user preferences, or other important details that improve future interactions.

### Task:
1. Determine if the new message is relevant to the current summary (e.g., it introduces new facts, updates existing details, or addresses unresolved issues).
2. If the message is relevant, update the summary by incorporating the new information while keeping it as short as possible.
3. If the message is not relevant, return the current summary unchanged.

### Output (in json format):
{"summary": "<updated summary>"}
"#;

pub struct LongMemoryUpdater {
    memories: UserLongTermMemoryBO,
    parameters: Arc<dyn ParameterStore>,
    http: HttpClient,
    service_url_parameter: String,
}

impl LongMemoryUpdater {
    pub fn new(
        memories: UserLongTermMemoryBO,
        parameters: Arc<dyn ParameterStore>,
        http: HttpClient,
        service_url_parameter: impl Into<String>,
    ) -> Self {
        Self {
            memories,
            parameters,
            http,
            service_url_parameter: service_url_parameter.into(),
        }
    }

    pub fn from_env(services: &Services) -> Result<Self> {
        let memory_table = get_env_var(env::USER_LONG_TERM_MEMORY_TABLE_NAME)?;
        let service_url_parameter = get_env_var(env::AI_JOB_SERVICE_URL_SSM_FULL_PATH)?;

        Ok(Self::new(
            services.memory_bo(memory_table),
            services.parameters.clone(),
            services.http.clone(),
            service_url_parameter,
        ))
    }

    async fn current_summary(&self, body: &Map<String, Value>, user_id: &str) -> Result<String> {
        match body.get("user_long_term_memory") {
            Some(Value::Null) => Ok(String::new()),
            Some(Value::String(summary)) => Ok(summary.clone()),
            Some(other) => Ok(other.to_string()),
            None => Ok(self
                .memories
                .get_last_memory(user_id)
                .await?
                .map(|memory| memory.memory)
                .unwrap_or_default()),
        }
    }
}

pub fn prompt(current_summary: &str, user_message: &str, bot_message: &str) -> String {
    format!(
        "### Current Summary:\n{current_summary}\n\n### New Message:\nUser: {user_message}\nChatbot: {bot_message}"
    )
}

/// The job's `output`, looked up at the top level and then under `body`.
fn job_output(response: &Value) -> Result<Value> {
    let nested = match response.get("body") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok(),
        Some(body) => Some(body.clone()),
        None => None,
    };

    response
        .get("output")
        .filter(|output| !output.is_null())
        .cloned()
        .or_else(|| {
            nested
                .as_ref()
                .and_then(|body| body.get("output"))
                .filter(|output| !output.is_null())
                .cloned()
        })
        .ok_or_else(|| KnowledgeError::UpstreamError {
            message: format!("Error while processing the message: {response}"),
        })
}

/// Text of the new memory extracted from the job output.
pub fn memory_text(output: &Value) -> String {
    match output {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(object)) => match object.get("summary") {
                Some(Value::String(summary)) => summary.clone(),
                _ => text.clone(),
            },
            _ => text.clone(),
        },
        Value::Object(object) => match object.get("summary") {
            Some(Value::String(summary)) => summary.clone(),
            _ => output.to_string(),
        },
        other => other.to_string(),
    }
}

#[async_trait]
impl Handler for LongMemoryUpdater {
    fn name(&self) -> &'static str {
        "long_memory_updater"
    }

    async fn handle(&self, body: Map<String, Value>) -> Result<Value> {
        let user_id = require_str(&body, "cbf_user_uuid")?;
        let user_message = require_str(&body, "user_message")?;
        let bot_message = require_str(&body, "bot_message")?;

        let summary = self.current_summary(&body, user_id).await?;
        let job = AiJob::text_based(
            prompt(&summary, user_message, bot_message),
            ASSISTANT_BEHAVIOUR.to_string(),
        );

        let service_url = self
            .parameters
            .get_parameter(&self.service_url_parameter)
            .await?;
        tracing::debug!(url = %service_url, "Posting AI job");
        let response = self.http.post_json(&service_url, &job).await?;

        let new_memory = memory_text(&job_output(&response)?);
        let record = self.memories.add_memory(user_id, &new_memory).await?;
        tracing::info!(
            user_id,
            timestamp = record.timestamp,
            "New memory updated for the user"
        );

        Ok(serde_json::to_value(&record)?)
    }
}
