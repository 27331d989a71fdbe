//! A small JSON document store with pluggable storage engines.
//!
//! This crate is the core of the docstore project and provides:
//!
//! - **Records** ([`record`]) - JSON records, identity values and typed documents
//! - **Storage engines** ([`engine`]) - The async contract every backing engine implements
//! - **Queries** ([`query`]) - Equality and `$in` filters plus sort options
//! - **Events** ([`event`]) - Lifecycle events and observers
//! - **Pipelines** ([`pipeline`]) - Ordered, short-circuiting hook stages
//! - **Schemas** ([`schema`]) - Casting, stripping and validation of records
//! - **Entity stores** ([`entity`]) - Schema-aware, hook-driven access to an engine
//! - **Snapshots** ([`snapshot`]) - Ordered exports of an engine's records
//! - **Data sets** ([`dataset`]) - Multi-record results with sequential consumption
//! - **Streams** ([`stream`]) - Stream adapters over engines
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docstore::prelude::*;
//!
//! let schema = SimpleSchema::builder()
//!     .field("name", Field::new(FieldKind::String).required())
//!     .build();
//!
//! let contacts = EntityStore::builder("contact", MemoryEngine::new(), schema).build();
//! let ada = contacts.create(into_record(json!({ "name": "Ada" }))?).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_core;

pub mod dataset;
pub mod engine;
pub mod entity;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod stream;
