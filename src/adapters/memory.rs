//! In-memory adapters for local runs (CLI fixtures) and tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::model::{PublishedEvent, Record};
use crate::domain::ports::{EventPublisher, KeyValueStore, ParameterStore};
use crate::domain::topology::TableSpec;
use crate::utils::error::{KnowledgeError, Result};

#[derive(Debug, Clone)]
struct MemoryTable {
    partition_key: String,
    sort_key: Option<String>,
    rows: Vec<Record>,
}

impl MemoryTable {
    fn key_of(&self, record: &Record) -> Result<(String, Option<String>)> {
        let pk = record
            .get(&self.partition_key)
            .and_then(key_text)
            .ok_or_else(|| {
                KnowledgeError::store(format!(
                    "Missing key attribute {} in item",
                    self.partition_key
                ))
            })?;

        let sk = match &self.sort_key {
            Some(name) => Some(record.get(name).and_then(key_text).ok_or_else(|| {
                KnowledgeError::store(format!("Missing key attribute {} in item", name))
            })?),
            None => None,
        };

        Ok((pk, sk))
    }

    fn check_key_name(&self, key_name: &str) -> Result<()> {
        if key_name != self.partition_key {
            return Err(KnowledgeError::store(format!(
                "Query condition missed key schema element: {}",
                self.partition_key
            )));
        }
        Ok(())
    }

    fn partition(&self, key_value: &str) -> impl Iterator<Item = &Record> + '_ {
        let key_value = key_value.to_string();
        self.rows.iter().filter(move |row| {
            row.get(&self.partition_key).and_then(key_text).as_deref() == Some(key_value.as_str())
        })
    }
}

/// Key attributes are strings or numbers.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(a), Some(b)) => key_text(a).cmp(&key_text(b)),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

/// Tables held in process memory, with DynamoDB-like key semantics: a put
/// replaces the row with the same key and queries must name the partition key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, name: &str, partition_key: &str, sort_key: Option<&str>) -> Result<()> {
        let mut tables = self.write()?;
        tables.insert(
            name.to_string(),
            MemoryTable {
                partition_key: partition_key.to_string(),
                sort_key: sort_key.map(str::to_string),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Creates a table under `name` with the key schema of `spec`.
    pub fn create_table_from_spec(&self, name: &str, spec: &TableSpec) -> Result<()> {
        self.create_table(
            name,
            spec.partition_key.name,
            spec.sort_key.as_ref().map(|key| key.name),
        )
    }

    pub fn insert(&self, table: &str, record: Record) -> Result<()> {
        let mut tables = self.write()?;
        let memory_table = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;

        let key = memory_table.key_of(&record)?;
        let position = memory_table
            .rows
            .iter()
            .position(|row| memory_table.key_of(row).ok().as_ref() == Some(&key));

        match position {
            Some(index) => memory_table.rows[index] = record,
            None => memory_table.rows.push(record),
        }
        Ok(())
    }

    pub fn len(&self, table: &str) -> Result<usize> {
        let tables = self.read()?;
        tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| table_not_found(table))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables
            .read()
            .map_err(|_| KnowledgeError::store("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables
            .write()
            .map_err(|_| KnowledgeError::store("in-memory store lock poisoned"))
    }
}

fn table_not_found(table: &str) -> KnowledgeError {
    KnowledgeError::store(format!("Table not found: {}", table))
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_by_partition_key(
        &self,
        table: &str,
        pk_name: &str,
        pk_value: &str,
    ) -> Result<Vec<Record>> {
        let tables = self.read()?;
        let memory_table = tables.get(table).ok_or_else(|| table_not_found(table))?;
        memory_table.check_key_name(pk_name)?;

        let mut rows: Vec<Record> = memory_table.partition(pk_value).cloned().collect();
        if let Some(sort_key) = &memory_table.sort_key {
            rows.sort_by(|a, b| compare_sort_values(a.get(sort_key), b.get(sort_key)));
        }
        Ok(rows)
    }

    async fn get_last_items_by_key(
        &self,
        table: &str,
        key_name: &str,
        key_value: &str,
        k: usize,
    ) -> Result<Vec<Record>> {
        let tables = self.read()?;
        let memory_table = tables.get(table).ok_or_else(|| table_not_found(table))?;
        memory_table.check_key_name(key_name)?;

        let mut rows: Vec<Record> = memory_table.partition(key_value).cloned().collect();
        if let Some(sort_key) = &memory_table.sort_key {
            rows.sort_by(|a, b| compare_sort_values(b.get(sort_key), a.get(sort_key)));
        }
        rows.truncate(k);
        Ok(rows)
    }

    async fn add_item(&self, table: &str, record: Record) -> Result<()> {
        self.insert(table, record)
    }
}

/// Keeps every published event in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<PublishedEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, detail_type: &str, message: &Value) -> Result<()> {
        let mut events = self.events.lock().map_err(|_| KnowledgeError::PublishError {
            message: "recording publisher lock poisoned".to_string(),
        })?;
        events.push(PublishedEvent {
            detail_type: detail_type.to_string(),
            message: message.clone(),
        });
        Ok(())
    }
}

/// Fixed parameter values. Counts lookups so callers can observe caching.
#[derive(Debug, Default)]
pub struct StaticParameters {
    values: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl StaticParameters {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl ParameterStore for StaticParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.lookups.fetch_add(1, AtomicOrdering::SeqCst);
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| KnowledgeError::ParameterError {
                message: format!("Parameter not found: {}", name),
            })
    }
}
