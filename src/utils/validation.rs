use crate::utils::error::{KnowledgeError, Result};
use serde_json::{Map, Value};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(KnowledgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(KnowledgeError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(KnowledgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(KnowledgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KnowledgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(KnowledgeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Returns the named body field when it is a non-blank string.
pub fn require_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match body.get(field).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(KnowledgeError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("role_source", "https://example.com").is_ok());
        assert!(validate_url("role_source", "http://example.com").is_ok());
        assert!(validate_url("role_source", "").is_err());
        assert!(validate_url("role_source", "invalid-url").is_err());
        assert!(validate_url("role_source", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("cache_capacity", 5, 1).is_ok());
        assert!(validate_positive_number("cache_capacity", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("http_timeout_secs", 30, 1, 900).is_ok());
        assert!(validate_range("http_timeout_secs", 0, 1, 900).is_err());
        assert!(validate_range("http_timeout_secs", 901, 1, 900).is_err());
    }

    #[test]
    fn test_require_str() {
        let body = json!({"app_id": "app-1", "blank": "  ", "number": 7});
        let body = body.as_object().unwrap();

        assert_eq!(require_str(body, "app_id").unwrap(), "app-1");
        assert!(matches!(
            require_str(body, "blank"),
            Err(KnowledgeError::MissingField { field }) if field == "blank"
        ));
        assert!(require_str(body, "number").is_err());
        assert!(require_str(body, "missing").is_err());
    }
}
