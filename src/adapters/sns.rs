use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client as SnsClient;
use serde_json::Value;

use crate::domain::ports::EventPublisher;
use crate::utils::error::{KnowledgeError, Result};

/// Message attribute carrying the event name, for subscription filters.
const DETAIL_TYPE_ATTR: &str = "detail_type";

const SOURCE_ATTR: &str = "source";

pub const EVENT_SOURCE: &str = "knowledge-manager";

/// Publishes handler results to a single SNS topic.
pub struct SnsPublisher {
    sns: SnsClient,
    topic_arn: String,
}

impl SnsPublisher {
    pub fn new(sns: SnsClient, topic_arn: impl Into<String>) -> Self {
        Self {
            sns,
            topic_arn: topic_arn.into(),
        }
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }
}

fn string_attribute(value: &str) -> Result<MessageAttributeValue> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(value)
        .build()
        .map_err(|e| KnowledgeError::PublishError {
            message: format!("Failed to build attribute: {}", e),
        })
}

#[async_trait]
impl EventPublisher for SnsPublisher {
    async fn publish(&self, detail_type: &str, message: &Value) -> Result<()> {
        let body = serde_json::to_string(message)?;

        let mut attrs = HashMap::new();
        attrs.insert(DETAIL_TYPE_ATTR.to_string(), string_attribute(detail_type)?);
        attrs.insert(SOURCE_ATTR.to_string(), string_attribute(EVENT_SOURCE)?);

        let output = self
            .sns
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(detail_type)
            .message(body)
            .set_message_attributes(Some(attrs))
            .send()
            .await
            .map_err(|e| KnowledgeError::PublishError {
                message: format!("Failed to publish to SNS: {}", e),
            })?;

        tracing::info!(
            detail_type,
            topic_arn = %self.topic_arn,
            message_id = ?output.message_id(),
            "Published event"
        );
        Ok(())
    }
}
