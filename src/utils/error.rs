use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{entity} not found for {key}: {value}{hint}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
        hint: String,
    },

    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    #[error("Upstream service error: {message}")]
    UpstreamError { message: String },

    #[error("Key-value store error: {message}")]
    StoreError { message: String, retryable: bool },

    #[error("Publish error: {message}")]
    PublishError { message: String },

    #[error("Parameter store error: {message}")]
    ParameterError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl KnowledgeError {
    pub fn missing_field(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingField { .. } | Self::InvalidEvent { .. } | Self::NotFound { .. } => {
                ErrorSeverity::High
            }
            Self::ApiError(_) | Self::UpstreamError { .. } | Self::PublishError { .. } => {
                ErrorSeverity::Medium
            }
            Self::StoreError { retryable: true, .. } => ErrorSeverity::Medium,
            Self::StoreError { .. } | Self::ParameterError { .. } | Self::SerializationError(_) => {
                ErrorSeverity::High
            }
            Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Transient failures that a redelivery of the same event may get past.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect(),
            Self::StoreError { retryable, .. } => *retryable,
            Self::UpstreamError { .. } | Self::PublishError { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingField { .. } | Self::InvalidEvent { .. } => {
                "Check the payload published to the trigger topic"
            }
            Self::NotFound { .. } => "Add the missing row to the table named in the error",
            Self::ApiError(_) | Self::UpstreamError { .. } => {
                "Check that the remote endpoint is reachable and healthy"
            }
            Self::StoreError { .. } => "Check the table name and the function's table grants",
            Self::PublishError { .. } => "Check EVENT_BUS_TOPIC_ARN and the publish permission",
            Self::ParameterError { .. } => "Check that the parameter exists and can be read",
            Self::SerializationError(_) => "Check that the JSON documents are well formed",
            Self::IoError(_) => "Check file paths and permissions",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Check the function's environment variables",
        }
    }
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;
