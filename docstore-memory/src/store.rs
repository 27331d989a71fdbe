//! In-memory storage engine.
//!
//! This module provides a simple in-memory engine that keeps records in insertion order
//! behind an async-safe read-write lock.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, trace};

use docstore_core::{
    engine::{EngineBuilder, Snapshot, StorageEngine, UpdateMode},
    error::{DocumentStoreError, DocumentStoreResult},
    event::{Event, Observer, Observers},
    query::{FindOptions, Query},
    record::{DEFAULT_ID_PROPERTY, Record, RecordId},
    snapshot::SnapshotData,
};

use crate::evaluator::{RecordEvaluator, sort_records};

/// Records keyed by identity value, plus their insertion order and the id sequence.
#[derive(Debug, Default)]
struct EngineState {
    records: HashMap<String, Record>,
    order: Vec<String>,
    id_seq: u64,
}

impl EngineState {
    /// Stores a record. Replacing an existing id keeps its original position.
    fn insert(&mut self, id: String, record: Record) {
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.records.remove(id)?;
        self.order.retain(|key| key != id);
        Some(record)
    }

    /// Removes every listed id with a single pass over the insertion order.
    fn remove_all(&mut self, ids: &HashSet<String>) {
        self.records.retain(|id, _| !ids.contains(id));
        self.order.retain(|id| !ids.contains(id));
    }

    fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
    }

    /// Mints the next sequence id, skipping ids already taken by caller-supplied values.
    fn next_id(&mut self) -> String {
        loop {
            self.id_seq += 1;
            let id = self.id_seq.to_string();

            if !self.records.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Thread-safe in-memory storage engine.
///
/// `MemoryEngine` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// shared across async tasks. Clones share the same records, sequence and observers.
///
/// Queries scan every record; there is no indexing.
///
/// # Example
///
/// ```ignore
/// use docstore_memory::MemoryEngine;
/// use docstore::engine::StorageEngine;
///
/// let engine = MemoryEngine::new();
/// let stored = engine.create(into_record(json!({ "name": "Alice" }))?).await?;
///
/// assert_eq!(stored["_id"], "1");
/// ```
#[derive(Clone, Debug)]
pub struct MemoryEngine {
    state: Arc<RwLock<EngineState>>,
    observers: Arc<Observers>,
    id_property: String,
}

impl MemoryEngine {
    /// Creates an empty engine using the default `_id` identity property.
    pub fn new() -> Self {
        Self::with_state(DEFAULT_ID_PROPERTY.to_string(), EngineState::default())
    }

    /// Creates a builder for an engine with a custom identity property or initial data.
    pub fn builder() -> MemoryEngineBuilder {
        MemoryEngineBuilder::default()
    }

    fn with_state(id_property: String, state: EngineState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            observers: Arc::new(Observers::new()),
            id_property,
        }
    }

    fn not_found(&self, id: &RecordId) -> DocumentStoreError {
        DocumentStoreError::DocumentNotFound {
            property: self.id_property.clone(),
            id: id.to_string(),
        }
    }

    async fn select(&self, query: &Query, options: &FindOptions) -> Vec<Record> {
        let mut records = {
            let state = self.state.read().await;
            RecordEvaluator::filter_records(state.iter(), query)
        };

        sort_records(&mut records, options.sort.as_ref());
        records
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    fn id_property(&self) -> &str {
        &self.id_property
    }

    async fn create(&self, mut record: Record) -> DocumentStoreResult<Record> {
        self.observers.emit(Event::Create(record.clone())).await;

        let stored = {
            let mut state = self.state.write().await;
            let id = match record.get(&self.id_property).and_then(RecordId::from_truthy) {
                Some(id) => id.into_inner(),
                None => state.next_id(),
            };

            record.insert(self.id_property.clone(), Value::String(id.clone()));
            state.insert(id, record.clone());
            record
        };

        debug!(id = ?stored.get(&self.id_property), "record created");
        self.observers.emit(Event::AfterCreate(stored.clone())).await;

        Ok(stored)
    }

    async fn read(&self, id: RecordId) -> DocumentStoreResult<Option<Record>> {
        let record = self
            .state
            .read()
            .await
            .records
            .get(id.as_str())
            .cloned();

        self.observers.emit(Event::Read(id)).await;

        Ok(record)
    }

    async fn update(&self, record: Record, mode: UpdateMode) -> DocumentStoreResult<Record> {
        self.observers
            .emit(Event::Update { record: record.clone(), mode })
            .await;

        let id = RecordId::of(&record, &self.id_property)
            .ok_or_else(|| DocumentStoreError::MissingIdentity(self.id_property.clone()))?;

        let saved = {
            let mut state = self.state.write().await;
            let stored = state
                .records
                .get_mut(id.as_str())
                .ok_or_else(|| self.not_found(&id))?;

            match mode {
                UpdateMode::Merge => stored.extend(record),
                UpdateMode::Overwrite => *stored = record,
            }

            stored.insert(self.id_property.clone(), id.to_value());
            stored.clone()
        };

        debug!(%id, ?mode, "record updated");
        self.observers.emit(Event::AfterUpdate(saved.clone())).await;

        Ok(saved)
    }

    async fn delete(&self, id: RecordId) -> DocumentStoreResult<()> {
        self.observers.emit(Event::Delete(id.clone())).await;

        self.state
            .write()
            .await
            .remove(id.as_str())
            .ok_or_else(|| self.not_found(&id))?;

        debug!(%id, "record deleted");
        self.observers.emit(Event::AfterDelete(id)).await;

        Ok(())
    }

    async fn delete_many(&self, query: Query) -> DocumentStoreResult<usize> {
        self.observers.emit(Event::DeleteMany(query.clone())).await;

        let deleted = {
            let mut state = self.state.write().await;
            let ids = state
                .order
                .iter()
                .filter(|id| {
                    state
                        .records
                        .get(id.as_str())
                        .is_some_and(|record| RecordEvaluator::new(record).evaluate(&query))
                })
                .cloned()
                .collect::<HashSet<_>>();

            state.remove_all(&ids);
            ids.len()
        };

        debug!(deleted, "records deleted by query");
        self.observers
            .emit(Event::AfterDeleteMany { query, deleted })
            .await;

        Ok(deleted)
    }

    async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<Record>> {
        let records = self.select(&query, &options).await;

        trace!(matched = records.len(), "find");
        self.observers.emit(Event::Find(query)).await;

        Ok(records)
    }

    async fn find_one(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Record>> {
        let record = self
            .select(&query, &options)
            .await
            .into_iter()
            .next();

        self.observers.emit(Event::FindOne(query)).await;

        Ok(record)
    }

    async fn count(&self, query: Query) -> DocumentStoreResult<usize> {
        let count = {
            let state = self.state.read().await;
            state
                .iter()
                .filter(|record| RecordEvaluator::new(record).evaluate(&query))
                .count()
        };

        self.observers.emit(Event::Count(query)).await;

        Ok(count)
    }

    async fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.observers.subscribe(observer).await
    }
}

#[async_trait]
impl Snapshot for MemoryEngine {
    async fn get_data(&self) -> DocumentStoreResult<SnapshotData> {
        let state = self.state.read().await;

        Ok(
            state
                .order
                .iter()
                .filter_map(|id| Some((id.clone(), state.records.get(id)?.clone())))
                .collect()
        )
    }
}

/// Builder for creating [`MemoryEngine`] instances.
///
/// # Example
///
/// ```ignore
/// use docstore_memory::MemoryEngine;
///
/// let engine = MemoryEngine::builder()
///     .id_property("key")
///     .data(saved)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEngineBuilder {
    id_property: String,
    data: Vec<(String, Record)>,
}

impl Default for MemoryEngineBuilder {
    fn default() -> Self {
        Self {
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            data: Vec::new(),
        }
    }
}

impl MemoryEngineBuilder {
    /// Sets the name of the identity property.
    pub fn id_property(mut self, id_property: impl Into<String>) -> Self {
        self.id_property = id_property.into();
        self
    }

    /// Seeds the engine with records keyed by identity value.
    ///
    /// Each record's identity property is set to its key. The id sequence continues from
    /// the largest numeric key.
    pub fn data(mut self, data: impl IntoIterator<Item = (String, Record)>) -> Self {
        self.data.extend(data);
        self
    }
}

#[async_trait]
impl EngineBuilder for MemoryEngineBuilder {
    type Engine = MemoryEngine;

    async fn build(self) -> DocumentStoreResult<Self::Engine> {
        let mut state = EngineState::default();

        for (id, mut record) in self.data {
            if id.is_empty() {
                return Err(DocumentStoreError::Initialization(
                    "records must have a non-empty identity value".to_string(),
                ));
            }

            if let Ok(n) = id.parse::<u64>() {
                state.id_seq = state.id_seq.max(n);
            }

            record.insert(self.id_property.clone(), Value::String(id.clone()));
            state.insert(id, record);
        }

        debug!(records = state.order.len(), id_seq = state.id_seq, "memory engine built");

        Ok(MemoryEngine::with_state(self.id_property, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::query::SortDirection;
    use serde_json::json;
    use std::sync::Mutex;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn id_of(record: &Record) -> String {
        record["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_generated_ids_are_distinct_strings() {
        let engine = MemoryEngine::new();
        let mut ids = HashSet::new();

        for _ in 0..20 {
            let stored = engine.create(Record::new()).await.unwrap();
            assert!(ids.insert(id_of(&stored)));
        }

        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_supplied_ids_are_coerced_to_strings() {
        let engine = MemoryEngine::new();

        let stored = engine.create(record(json!({ "_id": 6 }))).await.unwrap();

        assert_eq!(stored["_id"], json!("6"));
        assert_eq!(engine.read("6".into()).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_falsy_ids_mint_new_ids() {
        let engine = MemoryEngine::new();

        for falsy in [json!(null), json!(""), json!(false), json!(0), json!(0.0)] {
            let stored = engine
                .create(record(json!({ "_id": falsy.clone() })))
                .await
                .unwrap();

            assert_ne!(stored["_id"], falsy);
            assert!(!id_of(&stored).is_empty());
            assert_ne!(id_of(&stored), "0");
        }

        assert_eq!(engine.count(Query::new()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_minting_skips_taken_ids() {
        let engine = MemoryEngine::new();
        engine.create(record(json!({ "_id": "1", "a": 1 }))).await.unwrap();

        let minted = engine.create(Record::new()).await.unwrap();

        assert_eq!(minted["_id"], json!("2"));
        assert_eq!(engine.read("1".into()).await.unwrap().unwrap()["a"], json!(1));
    }

    #[tokio::test]
    async fn test_create_with_existing_id_replaces() {
        let engine = MemoryEngine::new();
        engine.create(record(json!({ "_id": "a", "v": 1, "w": 1 }))).await.unwrap();
        engine.create(record(json!({ "_id": "a", "v": 2 }))).await.unwrap();

        assert_eq!(
            engine.read("a".into()).await.unwrap(),
            Some(record(json!({ "_id": "a", "v": 2 })))
        );
        assert_eq!(engine.count(Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_merge_and_overwrite() {
        let engine = MemoryEngine::new();
        engine
            .create(record(json!({ "_id": "1", "a": 1, "b": 1 })))
            .await
            .unwrap();

        let merged = engine
            .update(record(json!({ "_id": "1", "b": 2 })), UpdateMode::Merge)
            .await
            .unwrap();
        assert_eq!(merged, record(json!({ "_id": "1", "a": 1, "b": 2 })));

        let replaced = engine
            .update(record(json!({ "_id": "1", "b": 2 })), UpdateMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(replaced, record(json!({ "_id": "1", "b": 2 })));
        assert_eq!(engine.read("1".into()).await.unwrap(), Some(replaced));
    }

    #[tokio::test]
    async fn test_update_normalizes_identity() {
        let engine = MemoryEngine::new();
        engine.create(record(json!({ "_id": 1, "a": 1 }))).await.unwrap();

        let saved = engine
            .update(record(json!({ "_id": 1, "a": 2 })), UpdateMode::Merge)
            .await
            .unwrap();

        assert_eq!(saved, record(json!({ "_id": "1", "a": 2 })));
    }

    #[tokio::test]
    async fn test_update_failures_leave_state_untouched() {
        let engine = MemoryEngine::new();

        let missing = engine
            .update(record(json!({ "a": 1 })), UpdateMode::Merge)
            .await
            .unwrap_err();
        assert_eq!(missing, DocumentStoreError::MissingIdentity("_id".into()));

        let not_found = engine
            .update(record(json!({ "_id": "999", "a": 1 })), UpdateMode::Merge)
            .await
            .unwrap_err();
        assert_eq!(
            not_found,
            DocumentStoreError::DocumentNotFound { property: "_id".into(), id: "999".into() }
        );
        assert_eq!(engine.count(Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let engine = MemoryEngine::new();
        let stored = engine.create(Record::new()).await.unwrap();
        let id = RecordId::new(id_of(&stored));

        engine.delete(id.clone()).await.unwrap();

        assert_eq!(engine.read(id.clone()).await.unwrap(), None);
        assert!(engine.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_many_counts_matches() {
        let engine = MemoryEngine::new();
        for kind in ["a", "b", "a"] {
            engine.create(record(json!({ "kind": kind }))).await.unwrap();
        }

        let removed = engine
            .delete_many(Query::builder().eq("kind", "a").build())
            .await
            .unwrap();
        let none = engine
            .delete_many(Query::builder().eq("kind", "z").build())
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(none, 0);
        assert_eq!(engine.count(Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_and_count_respect_query() {
        let engine = MemoryEngine::new();
        for n in 1..=5 {
            engine.create(record(json!({ "n": n, "odd": n % 2 == 1 }))).await.unwrap();
        }
        let odd = Query::builder().eq("odd", true).build();

        let all = engine.find(Query::new(), FindOptions::default()).await.unwrap();
        let matched = engine.find(odd.clone(), FindOptions::default()).await.unwrap();

        assert_eq!(all.len(), 5);
        assert_eq!(matched.len(), 3);
        assert!(matched.iter().all(|r| r["odd"] == json!(true)));
        assert_eq!(engine.count(odd).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_nested_path() {
        let engine = MemoryEngine::new();
        let first = engine
            .create(record(json!({ "findTest": { "nested": 1 } })))
            .await
            .unwrap();
        engine
            .create(record(json!({ "findTest": { "nested": 2 } })))
            .await
            .unwrap();

        let found = engine
            .find(Query::builder().eq("findTest.nested", 1).build(), FindOptions::default())
            .await
            .unwrap();

        assert_eq!(found, vec![first]);
    }

    #[tokio::test]
    async fn test_find_sorts_and_keeps_insertion_order_otherwise() {
        let engine = MemoryEngine::new();
        for a in [3, 1, 2] {
            engine.create(record(json!({ "a": a }))).await.unwrap();
        }
        let keys = |records: Vec<Record>| records.into_iter().map(|r| r["a"].clone()).collect::<Vec<_>>();

        let unsorted = engine.find(Query::new(), FindOptions::new()).await.unwrap();
        let asc = engine
            .find(Query::new(), FindOptions::new().sort("a", SortDirection::Asc))
            .await
            .unwrap();
        let desc = engine
            .find(Query::new(), FindOptions::new().sort("a", SortDirection::Desc))
            .await
            .unwrap();
        let first = engine
            .find_one(Query::new(), FindOptions::new().sort("a", SortDirection::Desc))
            .await
            .unwrap();

        assert_eq!(keys(unsorted), vec![json!(3), json!(1), json!(2)]);
        assert_eq!(keys(asc), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(keys(desc), vec![json!(3), json!(2), json!(1)]);
        assert_eq!(first.unwrap()["a"], json!(3));
    }

    #[tokio::test]
    async fn test_returned_records_are_isolated() {
        let engine = MemoryEngine::new();
        let mut created = engine.create(record(json!({ "_id": "1", "a": 1 }))).await.unwrap();
        created.insert("a".into(), json!(100));

        let mut found = engine.find(Query::new(), FindOptions::default()).await.unwrap();
        found[0].insert("a".into(), json!(200));
        let mut read = engine.read("1".into()).await.unwrap().unwrap();
        read.remove("a");

        assert_eq!(engine.read("1".into()).await.unwrap().unwrap()["a"], json!(1));
    }

    #[tokio::test]
    async fn test_create_or_update() {
        let engine = MemoryEngine::new();

        let created = engine.create_or_update(record(json!({ "a": 1 }))).await.unwrap();
        let unknown = engine
            .create_or_update(record(json!({ "_id": "x", "a": 2 })))
            .await
            .unwrap();
        let updated = engine
            .create_or_update(record(json!({ "_id": "x", "b": 3 })))
            .await
            .unwrap();

        assert_eq!(created["_id"], json!("1"));
        assert_eq!(unknown, record(json!({ "_id": "x", "a": 2 })));
        assert_eq!(updated, record(json!({ "_id": "x", "a": 2, "b": 3 })));
    }

    #[tokio::test]
    async fn test_emits_lifecycle_events() {
        let engine = MemoryEngine::new();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        engine
            .subscribe(Arc::new(move |event: &Event| sink.lock().unwrap().push(event.name())))
            .await;

        engine.create(record(json!({ "_id": "1" }))).await.unwrap();
        engine.read("1".into()).await.unwrap();
        engine.update(record(json!({ "_id": "1" })), UpdateMode::Merge).await.unwrap();
        engine.find_one(Query::new(), FindOptions::default()).await.unwrap();
        engine.count(Query::new()).await.unwrap();
        engine.delete("1".into()).await.unwrap();
        engine.delete_many(Query::new()).await.unwrap();

        assert_eq!(
            *names.lock().unwrap(),
            vec![
                "create",
                "afterCreate",
                "read",
                "update",
                "afterUpdate",
                "findOne",
                "count",
                "delete",
                "afterDelete",
                "deleteMany",
                "afterDeleteMany",
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_id_property() {
        let engine = MemoryEngine::builder().id_property("key").build().await.unwrap();

        let stored = engine.create(record(json!({ "a": 1 }))).await.unwrap();

        assert_eq!(engine.id_property(), "key");
        assert_eq!(stored["key"], json!("1"));
        assert!(!stored.contains_key("_id"));
    }

    #[tokio::test]
    async fn test_builder_seeds_records_and_sequence() {
        let engine = MemoryEngine::builder()
            .data([
                ("4".to_string(), record(json!({ "a": 1 }))),
                ("named".to_string(), record(json!({ "a": 2 }))),
            ])
            .build()
            .await
            .unwrap();

        let minted = engine.create(Record::new()).await.unwrap();
        let data = engine.get_data().await.unwrap();

        assert_eq!(minted["_id"], json!("5"));
        assert_eq!(data.get("4"), Some(&record(json!({ "_id": "4", "a": 1 }))));
        assert_eq!(data.ids().collect::<Vec<_>>(), vec!["4", "named", "5"]);
    }

    #[tokio::test]
    async fn test_snapshot_follows_insertion_order_after_deletes() {
        let engine = MemoryEngine::new();
        for n in 1..=11 {
            engine.create(record(json!({ "n": n, "even": n % 2 == 0 }))).await.unwrap();
        }

        engine
            .delete_many(Query::builder().eq("even", true).build())
            .await
            .unwrap();
        let data = engine.get_data().await.unwrap();

        assert_eq!(
            data.ids().collect::<Vec<_>>(),
            vec!["1", "3", "5", "7", "9", "11"]
        );
        assert_eq!(engine.count(Query::new()).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_builder_rejects_empty_ids() {
        let result = MemoryEngine::builder()
            .data([(String::new(), Record::new())])
            .build()
            .await;

        assert!(matches!(result, Err(DocumentStoreError::Initialization(_))));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let engine = MemoryEngine::new();
        let clone = engine.clone();

        engine.create(record(json!({ "_id": "1" }))).await.unwrap();

        assert!(clone.read("1".into()).await.unwrap().is_some());
    }
}
