//! Convenient re-exports of commonly used types from docstore.
//!
//! Import this prelude module to quickly access the most frequently used types and traits
//! without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docstore::prelude::*;
//! ```

pub use docstore_core::{
    dataset::DataSet,
    engine::{EngineBuilder, Snapshot, StorageEngine, UpdateMode},
    entity::{EntityStore, EntityStoreBuilder, EntityStoreOptions},
    error::{DocumentStoreError, DocumentStoreResult, Rejection},
    event::{Event, Observer, Observers},
    pipeline::{Pipeline, Stage, stage_fn},
    query::{FindOptions, Query, QueryBuilder, SortDirection, SortSpec},
    record::{Document, DocumentExt, Record, RecordId, into_record},
    schema::{Field, FieldKind, Schema, SimpleSchema, ValidationErrors},
    snapshot::SnapshotData,
    stream::{find_stream, write_stream},
};
pub use docstore_memory::{MemoryEngine, MemoryEngineBuilder};

#[cfg(feature = "file")]
pub use docstore_file::{FileEngine, FileEngineBuilder};

pub use serde_json::{Value, json};
