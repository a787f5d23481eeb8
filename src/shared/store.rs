//! Store collaborator: latest/recent reads, inserts and updates on named
//! streams of JSON records.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::id_generator::{IdGenerator, RandomIdGenerator};
use crate::time::{Clock, SystemClock};

/// One stored row
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "created_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record for stream {0} is not a JSON object")]
    NotAnObject(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store is closed")]
    Closed,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Most recent record of `stream`, if any
    async fn get_latest(&self, stream: &str) -> Result<Option<Record>, StoreError>;

    /// Up to `limit` records, most recent first. `filter` keeps records whose
    /// fields equal every entry of the filter; `order_by` names the sort
    /// field (default `created_at`).
    async fn get_recent(
        &self,
        stream: &str,
        limit: usize,
        filter: Option<&Record>,
        order_by: Option<&str>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Insert a record, stamping `id` and `created_at` when absent.
    /// Returns the record as stored.
    async fn insert(&self, stream: &str, record: Record) -> Result<Record, StoreError>;

    /// Merge `patch` into every record matching `matching`; returns the
    /// number of affected rows
    async fn update(&self, stream: &str, matching: &Record, patch: &Record) -> Result<u64, StoreError>;

    /// Release the underlying handle. Later calls may fail with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Fill `id` and `created_at` if the record does not carry them
pub fn stamp_record(record: &mut Record, ids: &dyn IdGenerator, clock: &dyn Clock) {
    record
        .entry(ID_FIELD)
        .or_insert_with(|| Value::String(ids.next_id()));
    record
        .entry(CREATED_AT_FIELD)
        .or_insert_with(|| Value::String(clock.now_rfc3339()));
}

/// True when every field of `filter` is present in `record` with an equal value
pub fn matches_filter(record: &Record, filter: &Record) -> bool {
    filter
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

/// Serialize a typed row into a record
pub fn to_record<T: Serialize>(stream: &str, value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(stream.to_string())),
    }
}

/// Ordering of two JSON field values for `order_by`. Numbers compare
/// numerically, strings lexicographically; anything else sorts first.
pub fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::MIN);
            let y = y.as_f64().unwrap_or(f64::MIN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(_)), _) | (Some(Value::String(_)), _) => Ordering::Greater,
        (_, Some(Value::Number(_))) | (_, Some(Value::String(_))) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Rows per stream are kept in insertion order; ties in
/// the sort field resolve newest-insert first.
pub struct MemoryStore {
    streams: RwLock<HashMap<String, Vec<Record>>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_sources(Arc::new(RandomIdGenerator::new()), Arc::new(SystemClock::new()))
    }

    pub fn with_sources(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            ids,
            clock,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Number of rows currently held in `stream`
    pub async fn len(&self, stream: &str) -> usize {
        self.streams
            .read()
            .await
            .get(stream)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, stream: &str) -> bool {
        self.len(stream).await == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_latest(&self, stream: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.get_recent(stream, 1, None, None).await?.into_iter().next())
    }

    async fn get_recent(
        &self,
        stream: &str,
        limit: usize,
        filter: Option<&Record>,
        order_by: Option<&str>,
    ) -> Result<Vec<Record>, StoreError> {
        self.ensure_open()?;
        let order_by = order_by.unwrap_or(CREATED_AT_FIELD);

        let streams = self.streams.read().await;
        let Some(rows) = streams.get(stream) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<(usize, &Record)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.map_or(true, |f| matches_filter(row, f)))
            .collect();
        selected.sort_by(|(ia, a), (ib, b)| {
            compare_field(b.get(order_by), a.get(order_by)).then(ib.cmp(ia))
        });

        Ok(selected
            .into_iter()
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn insert(&self, stream: &str, mut record: Record) -> Result<Record, StoreError> {
        self.ensure_open()?;
        stamp_record(&mut record, self.ids.as_ref(), self.clock.as_ref());

        self.streams
            .write()
            .await
            .entry(stream.to_string())
            .or_default()
            .push(record.clone());

        debug!(stream = %stream, "Inserted record");
        Ok(record)
    }

    async fn update(&self, stream: &str, matching: &Record, patch: &Record) -> Result<u64, StoreError> {
        self.ensure_open()?;

        let mut streams = self.streams.write().await;
        let Some(rows) = streams.get_mut(stream) else {
            return Ok(0);
        };

        let mut affected = 0;
        for row in rows.iter_mut().filter(|row| matches_filter(row, matching)) {
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            affected += 1;
        }

        debug!(stream = %stream, affected, "Updated records");
        Ok(affected)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, AtomicOrdering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_generator::SequentialIdGenerator;
    use crate::time::FixedClock;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn fixed_store() -> (MemoryStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap());
        let store = MemoryStore::with_sources(
            Arc::new(SequentialIdGenerator::new("row")),
            clock.clone(),
        );
        (store, clock)
    }

    #[tokio::test]
    async fn test_insert_stamps_id_and_created_at() {
        let (store, _) = fixed_store();

        let stored = store
            .insert("grinding_operations", record(json!({"power_consumption_kw": 1850.0})))
            .await
            .unwrap();

        assert_eq!(stored["id"], "row-1");
        assert_eq!(stored["created_at"], "2024-01-15T10:30:00.000Z");
        assert_eq!(stored["power_consumption_kw"], 1850.0);
    }

    #[tokio::test]
    async fn test_insert_keeps_caller_stamps() {
        let (store, _) = fixed_store();

        let stored = store
            .insert("ai_recommendations", record(json!({"id": "a1", "created_at": "2023-01-01T00:00:00.000Z"})))
            .await
            .unwrap();

        assert_eq!(stored["id"], "a1");
        assert_eq!(stored["created_at"], "2023-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_get_latest_follows_created_at() {
        let (store, clock) = fixed_store();

        store.insert("kiln_operations", record(json!({"coal_rate_tph": 10.0}))).await.unwrap();
        clock.advance(chrono::Duration::seconds(5));
        store.insert("kiln_operations", record(json!({"coal_rate_tph": 12.0}))).await.unwrap();

        let latest = store.get_latest("kiln_operations").await.unwrap().unwrap();
        assert_eq!(latest["coal_rate_tph"], 12.0);
    }

    #[tokio::test]
    async fn test_get_latest_ties_resolve_to_newest_insert() {
        let (store, _) = fixed_store();

        store.insert("kiln_operations", record(json!({"coal_rate_tph": 10.0}))).await.unwrap();
        store.insert("kiln_operations", record(json!({"coal_rate_tph": 11.0}))).await.unwrap();

        let latest = store.get_latest("kiln_operations").await.unwrap().unwrap();
        assert_eq!(latest["coal_rate_tph"], 11.0);
    }

    #[tokio::test]
    async fn test_get_latest_missing_stream() {
        let (store, _) = fixed_store();
        assert!(store.get_latest("raw_material_feed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_recent_filter_order_and_limit() {
        let (store, clock) = fixed_store();
        for (priority, taken) in [(1, false), (3, false), (2, true), (5, false)] {
            store
                .insert(
                    "ai_recommendations",
                    record(json!({"priority_level": priority, "action_taken": taken})),
                )
                .await
                .unwrap();
            clock.advance(chrono::Duration::seconds(1));
        }

        let filter = record(json!({"action_taken": false}));
        let rows = store
            .get_recent("ai_recommendations", 2, Some(&filter), Some("priority_level"))
            .await
            .unwrap();

        let priorities: Vec<i64> = rows.iter().map(|r| r["priority_level"].as_i64().unwrap()).collect();
        assert_eq!(priorities, vec![5, 3]);
    }

    #[tokio::test]
    async fn test_update_is_scoped_to_match() {
        let (store, _) = fixed_store();
        store.insert("ai_recommendations", record(json!({"action_taken": false}))).await.unwrap();
        store.insert("ai_recommendations", record(json!({"action_taken": false}))).await.unwrap();

        let matching = record(json!({"id": "row-2", "action_taken": false}));
        let patch = record(json!({"action_taken": true}));

        assert_eq!(store.update("ai_recommendations", &matching, &patch).await.unwrap(), 1);
        assert_eq!(store.update("ai_recommendations", &matching, &patch).await.unwrap(), 0);

        let untouched = record(json!({"id": "row-1"}));
        let rows = store
            .get_recent("ai_recommendations", 10, Some(&untouched), None)
            .await
            .unwrap();
        assert_eq!(rows[0]["action_taken"], false);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let (store, _) = fixed_store();
        store.close().await.unwrap();

        assert!(store.is_closed());
        assert!(matches!(
            store.get_latest("grinding_operations").await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.insert("grinding_operations", Record::new()).await,
            Err(StoreError::Closed)
        ));
    }

    #[test]
    fn test_to_record_rejects_non_objects() {
        assert!(matches!(
            to_record("optimization_results", &42),
            Err(StoreError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_compare_field_mixed_types() {
        let n = json!(3);
        let s = json!("a");
        assert_eq!(compare_field(Some(&n), None), Ordering::Greater);
        assert_eq!(compare_field(None, Some(&s)), Ordering::Less);
        assert_eq!(compare_field(None, None), Ordering::Equal);
    }
}
