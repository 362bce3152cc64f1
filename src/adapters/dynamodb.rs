//! DynamoDB implementation of [`KeyValueStore`].
//!
//! Rows travel as JSON maps; `json_to_attribute` and `attribute_to_json`
//! are the only places that know about `AttributeValue`.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::{Number, Value};

use crate::domain::model::Record;
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{KnowledgeError, Result};

pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn get_by_partition_key(
        &self,
        table: &str,
        pk_name: &str,
        pk_value: &str,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", pk_name)
                .expression_attribute_values(":pk", AttributeValue::S(pk_value.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| map_query_error(e, table))?;

            for item in output.items.unwrap_or_default() {
                records.push(item_to_record(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        tracing::debug!(table, count = records.len(), "queried partition");
        Ok(records)
    }

    async fn get_last_items_by_key(
        &self,
        table: &str,
        key_name: &str,
        key_value: &str,
        k: usize,
    ) -> Result<Vec<Record>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let output = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", key_name)
            .expression_attribute_values(":pk", AttributeValue::S(key_value.to_string()))
            .scan_index_forward(false)
            .limit(i32::try_from(k).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| map_query_error(e, table))?;

        output
            .items
            .unwrap_or_default()
            .iter()
            .map(item_to_record)
            .collect()
    }

    async fn add_item(&self, table: &str, record: Record) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(record_to_item(&record)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, table))?;

        Ok(())
    }
}

pub fn record_to_item(record: &Record) -> HashMap<String, AttributeValue> {
    record
        .data
        .iter()
        .map(|(name, value)| (name.clone(), json_to_attribute(value)))
        .collect()
}

pub fn item_to_record(item: &HashMap<String, AttributeValue>) -> Result<Record> {
    let mut data = HashMap::with_capacity(item.len());
    for (name, attribute) in item {
        data.insert(name.clone(), attribute_to_json(attribute)?);
    }
    Ok(Record { data })
}

pub fn json_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(name, value)| (name.clone(), json_to_attribute(value)))
                .collect(),
        ),
    }
}

pub fn attribute_to_json(attribute: &AttributeValue) -> Result<Value> {
    Ok(match attribute {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(
            items
                .iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(name, value)| Ok((name.clone(), attribute_to_json(value)?)))
                .collect::<Result<serde_json::Map<_, _>>>()?,
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => {
            return Err(KnowledgeError::store(format!(
                "Unsupported attribute type: {:?}",
                other
            )))
        }
    })
}

fn parse_number(n: &str) -> Result<Value> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::from(i));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| KnowledgeError::store(format!("Invalid number attribute: {}", n)))
}

fn is_transient<E, R>(err: &SdkError<E, R>) -> bool {
    matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    )
}

fn transient(message: impl Into<String>) -> KnowledgeError {
    KnowledgeError::StoreError {
        message: message.into(),
        retryable: true,
    }
}

fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
    table: &str,
) -> KnowledgeError {
    if is_transient(&err) {
        return transient(format!("Query on {} failed: {}", table, err));
    }
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => {
            KnowledgeError::store(format!("Table not found: {}", table))
        }
        QueryError::ProvisionedThroughputExceededException(_) => {
            transient("Throughput exceeded, please retry")
        }
        QueryError::RequestLimitExceeded(_) => transient("Request limit exceeded, please retry"),
        QueryError::InternalServerError(_) => transient("DynamoDB internal server error"),
        err => KnowledgeError::store(format!("Query on {} failed: {:?}", table, err)),
    }
}

fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    table: &str,
) -> KnowledgeError {
    if is_transient(&err) {
        return transient(format!("PutItem on {} failed: {}", table, err));
    }
    match err.into_service_error() {
        PutItemError::ResourceNotFoundException(_) => {
            KnowledgeError::store(format!("Table not found: {}", table))
        }
        PutItemError::ProvisionedThroughputExceededException(_) => {
            transient("Throughput exceeded, please retry")
        }
        PutItemError::RequestLimitExceeded(_) => transient("Request limit exceeded, please retry"),
        PutItemError::TransactionConflictException(_) => {
            transient("Transaction conflict, please retry")
        }
        PutItemError::ItemCollectionSizeLimitExceededException(_) => {
            KnowledgeError::store("Item collection size limit exceeded")
        }
        PutItemError::InternalServerError(_) => transient("DynamoDB internal server error"),
        err => KnowledgeError::store(format!("PutItem on {} failed: {:?}", table, err)),
    }
}
