//! Storage engine abstraction for the document store.
//!
//! This module defines the contract every backing engine implements, so that entity stores
//! behave identically whether records live in memory, in a file snapshot, or elsewhere.
//!
//! # Overview
//!
//! The [`StorageEngine`] trait provides a uniform async CRUD/query interface over a single
//! set of records addressed by an identity property (default `_id`). Engines also publish
//! lifecycle [`Event`](crate::event::Event)s to registered observers.
//!
//! # Traits
//!
//! - [`StorageEngine`]: The core trait for storage engines
//! - [`Snapshot`]: Engines that can export their full record set
//! - [`EngineBuilder`]: Factory trait for creating engine instances
//!
//! # Examples
//!
//! ```ignore
//! use docstore::engine::StorageEngine;
//! use serde_json::json;
//!
//! let engine = MemoryEngine::new();
//!
//! let created = engine.create(into_record(json!({ "name": "Alice" }))?).await?;
//! let id = RecordId::of(&created, engine.id_property()).ok_or("no id")?;
//! let read = engine.read(id).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::DocumentStoreResult,
    event::Observer,
    query::{FindOptions, Query},
    record::{Record, RecordId},
    snapshot::SnapshotData,
};

/// How an update combines the incoming record with the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Shallow-merge the incoming fields onto the stored record. Fields absent from the
    /// input are preserved.
    #[default]
    Merge,
    /// Replace the stored record entirely with the input.
    Overwrite,
}

/// Abstract interface for document storage engines.
///
/// # Identity
///
/// Every stored record has a non-empty string identity value. `create` mints one from a
/// per-engine sequence when the caller supplies none (or a falsy one) and coerces any
/// supplied value to a string. Creating with an id that is already stored replaces that
/// record (last write wins).
///
/// # Isolation
///
/// Engines own their records. Every record returned is an independent copy, so mutating
/// it never alters stored state.
///
/// # Error Handling
///
/// Domain failures (missing identity, not found, malformed query) are returned as
/// [`DocumentStoreError`](crate::error::DocumentStoreError) values; absence on `read` and
/// `find_one` is `Ok(None)`, not an error.
#[async_trait]
pub trait StorageEngine: Send + Sync + Debug {
    /// Returns the name of the identity property.
    fn id_property(&self) -> &str;

    /// Stores a new record and returns the stored copy, including its identity value.
    ///
    /// Emits `Create` with the input before storing and `AfterCreate` with the stored copy.
    async fn create(&self, record: Record) -> DocumentStoreResult<Record>;

    /// Returns the record with the given identity value, if any.
    ///
    /// Emits `Read`.
    async fn read(&self, id: RecordId) -> DocumentStoreResult<Option<Record>>;

    /// Updates a stored record, addressed by the record's own identity property.
    ///
    /// # Errors
    ///
    /// - [`MissingIdentity`](crate::error::DocumentStoreError::MissingIdentity) if the
    ///   identity property is absent or null
    /// - [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if no
    ///   record has that identity value; state is left untouched
    ///
    /// Emits `Update` before the checks and `AfterUpdate` after success.
    async fn update(&self, record: Record, mode: UpdateMode) -> DocumentStoreResult<Record>;

    /// Removes the record with the given identity value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) if
    /// no record has that identity value.
    ///
    /// Emits `Delete` before and `AfterDelete` after removal.
    async fn delete(&self, id: RecordId) -> DocumentStoreResult<()>;

    /// Removes every record matching the query and returns how many were removed.
    ///
    /// Matching nothing is not an error. Emits `DeleteMany` before and `AfterDeleteMany`
    /// after.
    async fn delete_many(&self, query: Query) -> DocumentStoreResult<usize>;

    /// Returns copies of all records matching the query, ordered by `options.sort`.
    ///
    /// Emits `Find`.
    async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<Record>>;

    /// Returns the first record `find` would return, if any.
    ///
    /// Emits `FindOne`.
    async fn find_one(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Record>>;

    /// Returns the number of records matching the query.
    ///
    /// Emits `Count`.
    async fn count(&self, query: Query) -> DocumentStoreResult<usize>;

    /// Registers an observer for this engine's events.
    async fn subscribe(&self, observer: Arc<dyn Observer>);

    /// Creates the record if it has no identity value or its identity is unknown,
    /// otherwise merges it onto the stored record.
    async fn create_or_update(&self, record: Record) -> DocumentStoreResult<Record> {
        let id = match RecordId::of(&record, self.id_property()) {
            Some(id) => id,
            None => return self.create(record).await,
        };

        match self.read(id).await? {
            Some(_) => self.update(record, UpdateMode::Merge).await,
            None => self.create(record).await,
        }
    }
}

/// Engines able to export their complete record set.
///
/// Persistence decorators call this after each committed mutation to serialize the full
/// state.
#[async_trait]
pub trait Snapshot: Send + Sync {
    /// Returns a copy of every stored record, keyed by identity value, in the order
    /// unsorted `find` results would list them.
    async fn get_data(&self) -> DocumentStoreResult<SnapshotData>;
}

#[async_trait]
impl<E> StorageEngine for Arc<E>
where
    E: StorageEngine + ?Sized,
{
    fn id_property(&self) -> &str {
        (**self).id_property()
    }

    async fn create(&self, record: Record) -> DocumentStoreResult<Record> {
        (**self).create(record).await
    }

    async fn read(&self, id: RecordId) -> DocumentStoreResult<Option<Record>> {
        (**self).read(id).await
    }

    async fn update(&self, record: Record, mode: UpdateMode) -> DocumentStoreResult<Record> {
        (**self).update(record, mode).await
    }

    async fn delete(&self, id: RecordId) -> DocumentStoreResult<()> {
        (**self).delete(id).await
    }

    async fn delete_many(&self, query: Query) -> DocumentStoreResult<usize> {
        (**self).delete_many(query).await
    }

    async fn find(&self, query: Query, options: FindOptions) -> DocumentStoreResult<Vec<Record>> {
        (**self).find(query, options).await
    }

    async fn find_one(
        &self,
        query: Query,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Record>> {
        (**self).find_one(query, options).await
    }

    async fn count(&self, query: Query) -> DocumentStoreResult<usize> {
        (**self).count(query).await
    }

    async fn subscribe(&self, observer: Arc<dyn Observer>) {
        (**self).subscribe(observer).await
    }

    async fn create_or_update(&self, record: Record) -> DocumentStoreResult<Record> {
        (**self).create_or_update(record).await
    }
}

#[async_trait]
impl<E> Snapshot for Arc<E>
where
    E: Snapshot + ?Sized,
{
    async fn get_data(&self) -> DocumentStoreResult<SnapshotData> {
        (**self).get_data().await
    }
}

#[async_trait]
pub trait EngineBuilder {
    type Engine: StorageEngine;

    async fn build(self) -> DocumentStoreResult<Self::Engine>;
}
