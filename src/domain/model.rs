use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One key-value table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.data.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.data.get(name).and_then(Value::as_i64)
    }
}

impl From<serde_json::Map<String, Value>> for Record {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppBehaviour {
    pub app_id: String,
    pub behaviour_source: String,
}

impl AppBehaviour {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("app_id", self.app_id.as_str())
            .with("behaviour_source", self.behaviour_source.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRole {
    pub app_id: String,
    pub role_source: String,
}

impl AppRole {
    pub fn to_record(&self) -> Record {
        Record::new()
            .with("app_id", self.app_id.as_str())
            .with("role_source", self.role_source.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLongTermMemory {
    pub user_id: String,
    /// Unix epoch seconds; the table's sort key.
    pub timestamp: i64,
    pub memory: String,
}

impl UserLongTermMemory {
    pub fn new(user_id: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().timestamp(),
            memory: memory.into(),
        }
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with("user_id", self.user_id.as_str())
            .with("timestamp", self.timestamp)
            .with("memory", self.memory.as_str())
    }

    /// Rows without a string `memory` are not memories.
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            user_id: record.get_str("user_id")?.to_string(),
            timestamp: record.get_i64("timestamp").unwrap_or_default(),
            memory: record.get_str("memory")?.to_string(),
        })
    }
}

/// Request body for the AI job service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJob {
    pub category: String,
    pub input: AiJobInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJobInput {
    pub text: String,
    pub assistant_behaviour: String,
}

impl AiJob {
    pub fn text_based(text: String, assistant_behaviour: String) -> Self {
        Self {
            category: "text-based".to_string(),
            input: AiJobInput {
                text,
                assistant_behaviour,
            },
        }
    }
}

/// A message handed to the event publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub detail_type: String,
    pub message: Value,
}
