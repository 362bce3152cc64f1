use std::env;
use std::time::Duration;

use crate::adapters::http::{HttpClient, DEFAULT_TIMEOUT_SECS};
use crate::utils::cache::DEFAULT_CAPACITY;
use crate::utils::error::{KnowledgeError, Result};
use crate::utils::validation::{validate_positive_number, validate_range, Validate};

#[cfg(feature = "aws")]
use crate::app::handlers::HandlerKind;
#[cfg(feature = "aws")]
use crate::app::Services;
#[cfg(feature = "aws")]
use crate::domain::ports::EventPublisher;
#[cfg(feature = "aws")]
use std::sync::Arc;

pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const CACHE_CAPACITY: &str = "CACHE_CAPACITY";
pub const SOURCE_CACHE_TTL_SECS: &str = "SOURCE_CACHE_TTL_SECS";
pub const MEMORY_CACHE_TTL_SECS: &str = "MEMORY_CACHE_TTL_SECS";
pub const PARAMETER_CACHE_TTL_SECS: &str = "PARAMETER_CACHE_TTL_SECS";

/// A required, non-blank environment variable.
pub fn get_env_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(KnowledgeError::MissingConfigError {
            field: name.to_string(),
        }),
    }
}

fn env_number(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|_| KnowledgeError::InvalidConfigValueError {
                    field: name.to_string(),
                    value: raw.clone(),
                    reason: "expected a non-negative integer".to_string(),
                })
        }
        _ => Ok(default),
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Process-wide settings shared by every handler.
///
/// A TTL of zero keeps memoized entries until they are evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub http_timeout_secs: u64,
    pub cache_capacity: usize,
    pub source_cache_ttl_secs: u64,
    pub memory_cache_ttl_secs: u64,
    pub parameter_cache_ttl_secs: u64,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_capacity: DEFAULT_CAPACITY,
            source_cache_ttl_secs: 300,
            memory_cache_ttl_secs: 60,
            parameter_cache_ttl_secs: 900,
            region: None,
            endpoint_url: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            http_timeout_secs: env_number(HTTP_TIMEOUT_SECS, defaults.http_timeout_secs)?,
            cache_capacity: env_number(CACHE_CAPACITY, defaults.cache_capacity as u64)? as usize,
            source_cache_ttl_secs: env_number(
                SOURCE_CACHE_TTL_SECS,
                defaults.source_cache_ttl_secs,
            )?,
            memory_cache_ttl_secs: env_number(
                MEMORY_CACHE_TTL_SECS,
                defaults.memory_cache_ttl_secs,
            )?,
            parameter_cache_ttl_secs: env_number(
                PARAMETER_CACHE_TTL_SECS,
                defaults.parameter_cache_ttl_secs,
            )?,
            region: optional_env("AWS_REGION"),
            endpoint_url: optional_env("AWS_ENDPOINT_URL"),
        })
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::new(Duration::from_secs(self.http_timeout_secs))
    }

    pub fn source_cache_ttl(&self) -> Option<Duration> {
        ttl(self.source_cache_ttl_secs)
    }

    pub fn memory_cache_ttl(&self) -> Option<Duration> {
        ttl(self.memory_cache_ttl_secs)
    }

    pub fn parameter_cache_ttl(&self) -> Option<Duration> {
        ttl(self.parameter_cache_ttl_secs)
    }

    /// Shared AWS configuration, honouring the region and endpoint overrides.
    #[cfg(feature = "aws")]
    pub async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &self.region {
            builder = builder.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        let sdk_config = builder.load().await;
        tracing::info!(
            region = ?sdk_config.region(),
            endpoint = ?self.endpoint_url,
            "AWS configuration loaded"
        );
        sdk_config
    }
}

fn ttl(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Validate for RuntimeConfig {
    fn validate(&self) -> Result<()> {
        validate_range(HTTP_TIMEOUT_SECS, self.http_timeout_secs, 1, 900)?;
        validate_positive_number(CACHE_CAPACITY, self.cache_capacity, 1)?;
        if let Some(endpoint) = &self.endpoint_url {
            crate::utils::validation::validate_url("AWS_ENDPOINT_URL", endpoint)?;
        }

        tracing::debug!("Runtime configuration validation passed");
        Ok(())
    }
}

/// DynamoDB, SSM and (for publishing handlers) SNS backed services.
#[cfg(feature = "aws")]
pub async fn aws_services(
    runtime: RuntimeConfig,
    kind: HandlerKind,
) -> Result<(Services, Option<Arc<dyn EventPublisher>>)> {
    use crate::adapters::dynamodb::DynamoDbStore;
    use crate::adapters::sns::SnsPublisher;
    use crate::adapters::ssm::SsmParameters;
    use crate::domain::topology::env as topology_env;

    let sdk_config = runtime.load_sdk_config().await;

    let publisher: Option<Arc<dyn EventPublisher>> = if kind.publishes() {
        let topic_arn = get_env_var(topology_env::EVENT_BUS_TOPIC_ARN)?;
        Some(Arc::new(SnsPublisher::new(
            aws_sdk_sns::Client::new(&sdk_config),
            topic_arn,
        )))
    } else {
        None
    };

    let services = Services::new(
        Arc::new(DynamoDbStore::new(aws_sdk_dynamodb::Client::new(&sdk_config))),
        Arc::new(SsmParameters::new(aws_sdk_ssm::Client::new(&sdk_config))),
        runtime,
    )?;

    Ok((services, publisher))
}

/// Entry point shared by the Lambda binaries.
#[cfg(feature = "lambda")]
pub async fn run_lambda(kind: HandlerKind) -> std::result::Result<(), lambda_runtime::Error> {
    use crate::core::engine::HandlerEngine;
    use lambda_runtime::{run, service_fn, LambdaEvent};
    use serde_json::Value;

    crate::utils::logger::init_lambda_logger();
    tracing::info!(handler = kind.name(), function = kind.function_name(), "Cold start");

    let runtime = RuntimeConfig::from_env()?;
    runtime.validate()?;

    let (services, publisher) = aws_services(runtime, kind).await?;
    let engine = Arc::new(HandlerEngine::new(kind.build(&services, publisher)?));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let engine = engine.clone();
        async move { engine.handle_event(event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.cache_capacity, 128);
        assert_eq!(config.source_cache_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.memory_cache_ttl(), Some(Duration::from_secs(60)));
        assert_eq!(config.parameter_cache_ttl(), Some(Duration::from_secs(900)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let config = RuntimeConfig {
            memory_cache_ttl_secs: 0,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.memory_cache_ttl(), None);
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = RuntimeConfig {
            http_timeout_secs: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // Each test below owns a distinct variable name so they can run in parallel.
    #[test]
    fn test_get_env_var() {
        env::set_var("KM_TEST_PRESENT_VAR", "table-a");
        env::set_var("KM_TEST_BLANK_VAR", "  ");

        assert_eq!(get_env_var("KM_TEST_PRESENT_VAR").unwrap(), "table-a");
        assert!(matches!(
            get_env_var("KM_TEST_BLANK_VAR"),
            Err(KnowledgeError::MissingConfigError { .. })
        ));
        assert!(matches!(
            get_env_var("KM_TEST_ABSENT_VAR"),
            Err(KnowledgeError::MissingConfigError { field }) if field == "KM_TEST_ABSENT_VAR"
        ));
    }

    #[test]
    fn test_env_number() {
        env::set_var("KM_TEST_NUMBER_OK", "42");
        env::set_var("KM_TEST_NUMBER_BAD", "forty");

        assert_eq!(env_number("KM_TEST_NUMBER_OK", 1).unwrap(), 42);
        assert_eq!(env_number("KM_TEST_NUMBER_ABSENT", 7).unwrap(), 7);
        assert!(matches!(
            env_number("KM_TEST_NUMBER_BAD", 1),
            Err(KnowledgeError::InvalidConfigValueError { .. })
        ));
    }
}
