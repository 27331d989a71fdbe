//! Lifecycle events and the observers that receive them.
//!
//! Engines and entity stores publish [`Event`]s to an [`Observers`] registry. Observers
//! are invoked synchronously, in registration order, once the operation's own state has
//! been committed and its locks released.
//!
//! "Before" events (`Create`, `Update`, ...) carry the value as the caller supplied it;
//! "after" events carry the stored value.

use mea::rwlock::RwLock;
use std::{fmt, sync::Arc};

use crate::{
    engine::UpdateMode,
    error::DocumentStoreError,
    query::Query,
    record::{Record, RecordId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A record is about to be created.
    Create(Record),
    /// A record was stored.
    AfterCreate(Record),
    /// A record was looked up by identity value.
    Read(RecordId),
    /// A record is about to be updated.
    Update {
        record: Record,
        mode: UpdateMode,
    },
    /// An update was applied; carries the saved record.
    AfterUpdate(Record),
    /// A record is about to be deleted.
    Delete(RecordId),
    /// A record was deleted.
    AfterDelete(RecordId),
    /// Records matching the query are about to be deleted.
    DeleteMany(Query),
    /// A bulk delete finished.
    AfterDeleteMany {
        query: Query,
        deleted: usize,
    },
    /// A find ran.
    Find(Query),
    /// A find-one ran.
    FindOne(Query),
    /// A count ran.
    Count(Query),
    /// An entity store operation failed.
    Error(DocumentStoreError),
}

impl Event {
    /// Returns the conventional name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Create(_) => "create",
            Event::AfterCreate(_) => "afterCreate",
            Event::Read(_) => "read",
            Event::Update { .. } => "update",
            Event::AfterUpdate(_) => "afterUpdate",
            Event::Delete(_) => "delete",
            Event::AfterDelete(_) => "afterDelete",
            Event::DeleteMany(_) => "deleteMany",
            Event::AfterDeleteMany { .. } => "afterDeleteMany",
            Event::Find(_) => "find",
            Event::FindOne(_) => "findOne",
            Event::Count(_) => "count",
            Event::Error(_) => "error",
        }
    }
}

/// Receives events published by an engine or entity store.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &Event);
}

impl<F> Observer for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, event: &Event) {
        self(event)
    }
}

/// An ordered registry of observers.
#[derive(Default)]
pub struct Observers {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. It receives every event emitted after this call.
    pub async fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.observers
            .write()
            .await
            .push(observer);
    }

    /// Publishes an event to every registered observer.
    pub async fn emit(&self, event: Event) {
        let observers = self.observers.read().await;

        tracing::trace!(event = event.name(), observers = observers.len(), "emitting event");

        for observer in observers.iter() {
            observer.notify(&event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").finish_non_exhaustive()
    }
}
