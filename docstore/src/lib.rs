//! Main docstore crate providing a unified interface for document storage.
//!
//! This crate is the primary entry point for users of docstore. It re-exports the core
//! types from the sub-crates and gives convenient access to the storage engines.
//!
//! # Features
//!
//! - **Pluggable engines** - The same CRUD/query contract in memory or persisted to a file
//! - **Entity stores** - Schema casting, validation and hook pipelines around every mutation
//! - **Simple queries** - Equality, dot-path and `$in` filters with sorting
//! - **Observers** - Lifecycle events for engines and entity stores
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = SimpleSchema::builder()
//!         .field("name", Field::new(FieldKind::String).required())
//!         .field("age", Field::new(FieldKind::Integer))
//!         .build();
//!
//!     let contacts = docstore::entity_store("contact", schema).build();
//!
//!     let ada = contacts
//!         .create(into_record(json!({ "name": "Ada", "age": "36" }))?)
//!         .await?;
//!     assert_eq!(ada["age"], 36);
//!
//!     let adults = contacts
//!         .find(Query::builder().eq("name", "Ada").build())
//!         .await?;
//!     assert_eq!(adults.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Persistence
//!
//! With the `file` feature (on by default), [`file::FileEngine`] keeps records in a JSON
//! file and rewrites it after every committed mutation:
//!
//! ```ignore
//! use docstore::{prelude::*, file::FileEngine};
//!
//! let engine = FileEngine::builder().path("contacts.json").build().await?;
//! let contacts = EntityStore::builder("contact", engine, schema).build();
//! ```
//!
//! # Engines
//!
//! - [`memory`] - Fast in-memory storage
//! - [`file`] - JSON file persistence (requires the `file` feature)

use docstore_core::{
    entity::{EntityStore, EntityStoreBuilder},
    schema::Schema,
};
use docstore_memory::MemoryEngine;

pub mod prelude;

pub use docstore_core::{
    dataset, engine, entity, error, event, pipeline, query, record, schema, snapshot, stream,
};

pub use async_trait::async_trait;
pub use serde_json;

/// In-memory storage engine implementations.
pub mod memory {
    pub use docstore_memory::{MemoryEngine, MemoryEngineBuilder};
}

/// File-persisted storage engine implementations.
///
/// This module is only available when the `file` feature is enabled.
#[cfg(feature = "file")]
pub mod file {
    pub use docstore_file::{DEFAULT_PATH, FileEngine, FileEngineBuilder};
}

/// Starts configuring an entity store over a fresh [`MemoryEngine`].
pub fn entity_store<S: Schema + 'static>(
    name: impl Into<String>,
    schema: S,
) -> EntityStoreBuilder<MemoryEngine, S> {
    EntityStore::builder(name, MemoryEngine::new(), schema)
}
