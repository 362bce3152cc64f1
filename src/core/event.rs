//! Trigger event unwrapping.
//!
//! Handlers work on a JSON object body. The body reaches the function in one
//! of several envelopes:
//!
//! * SNS notification: `Records[].Sns.Message` holds the body as JSON text,
//!   one body per record;
//! * EventBridge: `{"detail": {..}}`, with or without `detail-type`;
//! * HTTP style: `{"body": "<json>"}` or `{"body": {..}}`;
//! * direct invocation: the event is the body.

use aws_lambda_events::event::sns::SnsEvent;
use serde_json::{Map, Value};

use crate::utils::error::{KnowledgeError, Result};

pub fn extract_bodies(event: Value) -> Result<Vec<Map<String, Value>>> {
    if event.get("Records").is_some() {
        return sns_bodies(event);
    }
    Ok(vec![unwrap_envelope(event)?])
}

fn sns_bodies(event: Value) -> Result<Vec<Map<String, Value>>> {
    let sns_event: SnsEvent = serde_json::from_value(event).map_err(|e| invalid(format!(
        "not an SNS notification: {}",
        e
    )))?;

    if sns_event.records.is_empty() {
        return Err(invalid("SNS notification without records"));
    }

    sns_event
        .records
        .into_iter()
        .map(|record| {
            let message: Value = serde_json::from_str(&record.sns.message).map_err(|e| {
                invalid(format!(
                    "SNS message {} is not JSON: {}",
                    record.sns.message_id, e
                ))
            })?;
            unwrap_envelope(message)
        })
        .collect()
}

fn unwrap_envelope(value: Value) -> Result<Map<String, Value>> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(invalid(format!(
                "expected a JSON object body, got {}",
                kind(&other)
            )))
        }
    };

    if map.get("detail").is_some_and(Value::is_object) {
        if let Some(Value::Object(detail)) = map.remove("detail") {
            return Ok(detail);
        }
    }

    match map.get("body") {
        Some(Value::String(text)) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|e| invalid(format!("body is not JSON: {}", e)))?;
            unwrap_envelope(parsed)
        }
        Some(Value::Object(_)) => match map.remove("body") {
            Some(Value::Object(body)) => Ok(body),
            _ => Ok(map),
        },
        _ => Ok(map),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invalid(message: impl Into<String>) -> KnowledgeError {
    KnowledgeError::InvalidEvent {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sns_event(messages: &[&str]) -> Value {
        let records: Vec<Value> = messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                json!({
                    "EventVersion": "1.0",
                    "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:KnowledgeManager-ContextToBeRetrieved:21be56ed-a058-49f5-8c98-aedd2564c486",
                    "EventSource": "aws:sns",
                    "Sns": {
                        "SignatureVersion": "1",
                        "Timestamp": "2024-01-02T12:45:07.000Z",
                        "Signature": "tcc6faL2yUC6dgZdmrwh1Y4cGa/ebXEkAi6RibDsvpi+tE/1+82j...65r==",
                        "SigningCertUrl": "https://sns.us-east-1.amazonaws.com/SimpleNotificationService-ac565b8b1a6c5d002d285f9598aa1d9b.pem",
                        "MessageId": format!("95df01b4-ee98-5cb9-9903-4c221d41eb5{}", i),
                        "Message": message,
                        "MessageAttributes": {},
                        "Type": "Notification",
                        "UnsubscribeUrl": "https://sns.us-east-1.amazonaws.com/?Action=Unsubscribe",
                        "TopicArn": "arn:aws:sns:us-east-1:123456789012:KnowledgeManager-ContextToBeRetrieved",
                        "Subject": null
                    }
                })
            })
            .collect();
        json!({ "Records": records })
    }

    #[test]
    fn test_direct_invocation() {
        let bodies = extract_bodies(json!({"app_id": "app-1"})).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["app_id"], "app-1");
    }

    #[test]
    fn test_sns_records_in_order() {
        let event = sns_event(&[r#"{"app_id": "a"}"#, r#"{"app_id": "b"}"#]);

        let bodies = extract_bodies(event).unwrap();
        let ids: Vec<_> = bodies.iter().map(|b| b["app_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sns_message_must_be_json_object() {
        let err = extract_bodies(sns_event(&["Hello from SNS!"])).unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidEvent { .. }));

        let err = extract_bodies(sns_event(&["[1, 2]"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_sns_without_records() {
        let err = extract_bodies(json!({"Records": []})).unwrap_err();
        assert!(err.to_string().contains("without records"));
    }

    #[test]
    fn test_eventbridge_detail() {
        let event = json!({
            "version": "0",
            "detail-type": "ContextRetrieved",
            "source": "knowledge-manager",
            "detail": {"app_id": "app-1", "cbf_user_uuid": "u1"}
        });

        let bodies = extract_bodies(event).unwrap();
        assert_eq!(bodies[0], *json!({"app_id": "app-1", "cbf_user_uuid": "u1"}).as_object().unwrap());
    }

    #[test]
    fn test_bare_detail() {
        let bodies = extract_bodies(json!({"detail": {"app_id": "app-1", "cbf_user_uuid": "u1"}})).unwrap();

        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].get("app_id"), Some(&json!("app-1")));
        assert_eq!(bodies[0].get("cbf_user_uuid"), Some(&json!("u1")));
    }

    #[test]
    fn test_body_string_and_object() {
        let bodies = extract_bodies(json!({"body": "{\"app_id\": \"x\"}"})).unwrap();
        assert_eq!(bodies[0]["app_id"], "x");

        let bodies = extract_bodies(json!({"body": {"app_id": "y"}})).unwrap();
        assert_eq!(bodies[0]["app_id"], "y");

        assert!(extract_bodies(json!({"body": "not json"})).is_err());
    }

    #[test]
    fn test_non_object_event() {
        assert!(extract_bodies(json!("app-1")).is_err());
        assert!(extract_bodies(Value::Null).is_err());
    }
}
