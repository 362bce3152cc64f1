use async_trait::async_trait;
use aws_sdk_ssm::Client as SsmClient;

use crate::domain::ports::ParameterStore;
use crate::utils::error::{KnowledgeError, Result};

/// Reads (and decrypts) SSM parameters by full path.
pub struct SsmParameters {
    client: SsmClient,
}

impl SsmParameters {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| KnowledgeError::ParameterError {
                message: format!("Failed to read parameter {}: {}", name, e),
            })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| KnowledgeError::ParameterError {
                message: format!("Parameter {} has no value", name),
            })
    }
}
