//! In-memory storage engine for docstore.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StorageEngine`
//! trait. It uses async-aware read-write locks for concurrent access and is ideal for
//! development, testing and small data sets.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full query support** - Equality, dot-path and `$in` filtering plus sorting
//! - **Insertion order** - Unsorted results come back in the order records were created
//! - **Snapshots** - Exports the full record set for persistence decorators
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::{memory::MemoryEngine, engine::StorageEngine, record::into_record};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MemoryEngine::new();
//!
//!     let user = engine.create(into_record(json!({ "name": "Alice" }))?).await?;
//!     assert_eq!(user["_id"], "1");
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_memory;

pub mod evaluator;
pub mod store;

pub use store::{MemoryEngine, MemoryEngineBuilder};
