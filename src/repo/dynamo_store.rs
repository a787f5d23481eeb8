use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use cement_plant::shared::store::{
    compare_field, matches_filter, stamp_record, Record, Store, StoreError, CREATED_AT_FIELD,
    ID_FIELD,
};
use cement_plant::{Clock, IdGenerator, RandomIdGenerator, SystemClock};

/// Partition key attribute: the stream name
const PARTITION_KEY: &str = "stream";
/// Sort key attribute: `{created_at}#{id}`, so a descending query is newest first
const SORT_KEY: &str = "sk";

type Item = HashMap<String, AttributeValue>;

/// Single-table DynamoDB store. Every stream is one partition.
pub struct DynamoStore {
    client: DynamoDbClient,
    table_name: String,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl DynamoStore {
    /// Create a store over one DynamoDB table
    ///
    /// Ids and timestamps for stamped records come from the system sources.
    ///
    /// # Arguments
    /// * `client` - DynamoDB client
    /// * `table_name` - Name of the single plant table
    ///
    /// # Returns
    /// * `DynamoStore` - Open store; `close` releases it
    pub fn new(client: DynamoDbClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            ids: Arc::new(RandomIdGenerator::new()),
            clock: Arc::new(SystemClock::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Query one stream partition newest first
    ///
    /// Follows pagination until `limit` items are collected.
    ///
    /// # Arguments
    /// * `stream` - Stream name (partition key value)
    /// * `limit` - Maximum number of items, or `None` for the whole partition
    ///
    /// # Returns
    /// * `Ok(Vec<Item>)` - Raw items, newest first
    /// * `Err(StoreError::Backend)` - DynamoDB error occurred
    async fn query_stream(&self, stream: &str, limit: Option<usize>) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut query = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :stream")
                .expression_attribute_names("#pk", PARTITION_KEY)
                .expression_attribute_values(":stream", AttributeValue::S(stream.to_string()))
                .scan_index_forward(false)
                .set_exclusive_start_key(start_key.take());

            if let Some(limit) = limit {
                let remaining = limit.saturating_sub(items.len());
                query = query.limit(i32::try_from(remaining).unwrap_or(i32::MAX));
            }

            let result = query
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("{:?}", e)))?;

            items.extend(result.items.unwrap_or_default());

            let full = limit.map_or(false, |limit| items.len() >= limit);
            match result.last_evaluated_key {
                Some(key) if !full => start_key = Some(key),
                _ => break,
            }
        }

        debug!(stream = %stream, count = items.len(), "Queried stream");
        Ok(items)
    }
}

/// Convert a DynamoDB item into a JSON record
///
/// # Arguments
/// * `item` - Item as returned by Query
///
/// # Returns
/// * `Ok(Record)` - Record without the `stream` and `sk` key attributes
/// * `Err(StoreError::Backend)` - Item holds a value JSON cannot express
fn item_to_record(mut item: Item) -> Result<Record, StoreError> {
    item.remove(PARTITION_KEY);
    item.remove(SORT_KEY);
    serde_dynamo::from_item(item).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Convert a stamped record into an item carrying both key attributes
///
/// # Arguments
/// * `stream` - Stream name written as the partition key
/// * `record` - Record with `id` and `created_at` already set
///
/// # Returns
/// * `Ok(Item)` - Item ready for PutItem
/// * `Err(StoreError::Backend)` - Record could not be converted
fn record_to_item(stream: &str, record: &Record) -> Result<Item, StoreError> {
    let mut item: Item =
        serde_dynamo::to_item(record).map_err(|e| StoreError::Backend(e.to_string()))?;
    item.insert(PARTITION_KEY.to_string(), AttributeValue::S(stream.to_string()));
    item.insert(SORT_KEY.to_string(), AttributeValue::S(sort_key(record)));
    Ok(item)
}

/// Sort key of a record: `{created_at}#{id}`
fn sort_key(record: &Record) -> String {
    format!(
        "{}#{}",
        field_text(record.get(CREATED_AT_FIELD)),
        field_text(record.get(ID_FIELD))
    )
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Expressions of one conditional UpdateItem
#[derive(Debug, Clone, PartialEq)]
struct UpdateExpressions {
    update: String,
    condition: String,
    names: HashMap<String, String>,
    values: Item,
}

/// Build the SET expression for `patch` and a condition that re-checks
/// every `matching` field on the stored item
///
/// # Arguments
/// * `matching` - Field values the row must still hold when it is written
/// * `patch` - Field values to set
///
/// # Returns
/// * `Ok(UpdateExpressions)` - Expressions with their name and value placeholders
/// * `Err(StoreError::Backend)` - A value could not be converted to an attribute
fn update_expressions(matching: &Record, patch: &Record) -> Result<UpdateExpressions, StoreError> {
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    let mut assignments = Vec::with_capacity(patch.len());
    for (index, (field, value)) in patch.iter().enumerate() {
        names.insert(format!("#f{}", index), field.clone());
        values.insert(format!(":v{}", index), to_attribute(value)?);
        assignments.push(format!("#f{} = :v{}", index, index));
    }

    // Never recreate a row deleted since the read
    names.insert("#pk".to_string(), PARTITION_KEY.to_string());
    let mut conditions = vec!["attribute_exists(#pk)".to_string()];
    for (index, (field, value)) in matching.iter().enumerate() {
        names.insert(format!("#m{}", index), field.clone());
        values.insert(format!(":m{}", index), to_attribute(value)?);
        conditions.push(format!("#m{} = :m{}", index, index));
    }

    Ok(UpdateExpressions {
        update: format!("SET {}", assignments.join(", ")),
        condition: conditions.join(" AND "),
        names,
        values,
    })
}

fn to_attribute(value: &Value) -> Result<AttributeValue, StoreError> {
    serde_dynamo::to_attribute_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl Store for DynamoStore {
    async fn get_latest(&self, stream: &str) -> Result<Option<Record>, StoreError> {
        self.ensure_open()?;
        let items = self.query_stream(stream, Some(1)).await?;
        items.into_iter().next().map(item_to_record).transpose()
    }

    async fn get_recent(
        &self,
        stream: &str,
        limit: usize,
        filter: Option<&Record>,
        order_by: Option<&str>,
    ) -> Result<Vec<Record>, StoreError> {
        self.ensure_open()?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        // The sort key already orders by created_at; anything else is
        // filtered and sorted here over the whole partition
        let default_order = order_by.map_or(true, |field| field == CREATED_AT_FIELD);
        let query_limit = if filter.is_none() && default_order {
            Some(limit)
        } else {
            None
        };

        let mut records = self
            .query_stream(stream, query_limit)
            .await?
            .into_iter()
            .map(item_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(filter) = filter {
            records.retain(|record| matches_filter(record, filter));
        }
        if let Some(field) = order_by.filter(|_| !default_order) {
            // Stable sort keeps the newest-first order among ties
            records.sort_by(|a, b| compare_field(b.get(field), a.get(field)));
        }
        records.truncate(limit);
        Ok(records)
    }

    async fn insert(&self, stream: &str, mut record: Record) -> Result<Record, StoreError> {
        self.ensure_open()?;
        stamp_record(&mut record, self.ids.as_ref(), self.clock.as_ref());

        let item = record_to_item(stream, &record)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("{:?}", e)))?;

        debug!(stream = %stream, "Inserted record");
        Ok(record)
    }

    async fn update(&self, stream: &str, matching: &Record, patch: &Record) -> Result<u64, StoreError> {
        self.ensure_open()?;
        if patch.is_empty() {
            return Ok(0);
        }

        let targets: Vec<Record> = self
            .query_stream(stream, None)
            .await?
            .into_iter()
            .map(item_to_record)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|record| matches_filter(record, matching))
            .collect();

        let expressions = update_expressions(matching, patch)?;

        // A row counts only if it still matches when written
        let mut affected = 0u64;
        for record in &targets {
            let result = self
                .client
                .update_item()
                .table_name(&self.table_name)
                .key(PARTITION_KEY, AttributeValue::S(stream.to_string()))
                .key(SORT_KEY, AttributeValue::S(sort_key(record)))
                .update_expression(&expressions.update)
                .condition_expression(&expressions.condition)
                .set_expression_attribute_names(Some(expressions.names.clone()))
                .set_expression_attribute_values(Some(expressions.values.clone()))
                .send()
                .await;

            match result {
                Ok(_) => affected += 1,
                Err(e)
                    if e
                        .as_service_error()
                        .map_or(false, |service| service.is_conditional_check_failed_exception()) =>
                {
                    debug!(stream = %stream, id = ?record.get(ID_FIELD), "Row no longer matches, skipped");
                }
                Err(e) => return Err(StoreError::Backend(format!("{:?}", e))),
            }
        }

        debug!(stream = %stream, affected, "Updated records");
        Ok(affected)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(table = %self.table_name, "DynamoDB store closed");
        }
        Ok(())
    }
}
