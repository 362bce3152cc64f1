use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::utils::error::{KnowledgeError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Outbound HTTP used by the handlers: fetching source documents and calling
/// the AI job service.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Body of a GET as text. An empty body is `None`.
    pub async fn get_text(&self, url: &str) -> Result<Option<String>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(KnowledgeError::UpstreamError {
                message: format!("GET {} returned {}", url, status),
            });
        }

        let text = response.text().await?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    /// POSTs `payload` as JSON. A body that is not JSON comes back as a
    /// JSON string.
    pub async fn post_json<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Result<Value> {
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(KnowledgeError::UpstreamError {
                message: format!("POST {} returned {}: {}", url, status, text),
            });
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).expect("HTTP client builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_new_applies_timeout() {
        let client = HttpClient::new(Duration::from_millis(250));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_get_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/role.md");
            then.status(200).body("You are a helpful tutor.");
        });

        let client = HttpClient::default();
        let text = client.get_text(&server.url("/role.md")).await.unwrap();

        mock.assert();
        assert_eq!(text.as_deref(), Some("You are a helpful tutor."));
    }

    #[tokio::test]
    async fn test_get_text_empty_body_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/empty");
            then.status(200);
        });

        let client = HttpClient::default();
        assert_eq!(client.get_text(&server.url("/empty")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_text_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let client = HttpClient::default();
        let err = client.get_text(&server.url("/missing")).await.unwrap_err();

        assert!(matches!(err, KnowledgeError::UpstreamError { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_post_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/jobs")
                .json_body(json!({"category": "text-based"}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"output": "done"}));
        });

        let client = HttpClient::default();
        let result = client
            .post_json(&server.url("/jobs"), &json!({"category": "text-based"}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result, json!({"output": "done"}));
    }

    #[tokio::test]
    async fn test_post_json_plain_text_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/jobs");
            then.status(200).body("accepted");
        });

        let client = HttpClient::default();
        let result = client
            .post_json(&server.url("/jobs"), &json!({}))
            .await
            .unwrap();

        assert_eq!(result, Value::String("accepted".to_string()));
    }
}
