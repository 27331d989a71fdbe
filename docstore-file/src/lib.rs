//! File-persisted storage engine for docstore.
//!
//! This crate provides [`FileEngine`], a decorator that keeps a wrapped engine's records
//! in a JSON file, rewriting the file after every committed mutation.
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::{file::FileEngine, engine::{EngineBuilder, StorageEngine}};
//!
//! let engine = FileEngine::builder().path("contacts.json").build().await?;
//! engine.create(into_record(json!({ "name": "Alice" }))?).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_file;

pub mod engine;

pub use engine::{DEFAULT_PATH, FileEngine, FileEngineBuilder};
