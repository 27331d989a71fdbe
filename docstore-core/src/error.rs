//! Error types and result types for document store operations.
//!
//! Every fallible engine and entity-store operation returns a [`DocumentStoreResult<T>`].
//! Entity-store mutations additionally hand back the caller's original input through
//! [`Rejection`] so rejected data can be inspected or re-rendered.

use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, fmt, io::Error as IoError};
use thiserror::Error;

use crate::schema::ValidationErrors;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between records and other formats.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during engine initialization, such as loading a persisted snapshot.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An I/O error raised while reading or writing durable storage.
    #[error("I/O error: {0}")]
    Io(String),
    /// The record handed to an update carries no identity value.
    /// The argument is the name of the identity property.
    #[error("Object has no '{0}' property")]
    MissingIdentity(String),
    /// No stored record has the given identity value.
    #[error("No object found with '{property}' = '{id}'")]
    DocumentNotFound {
        /// Name of the identity property.
        property: String,
        /// The identity value that was looked up.
        id: String,
    },
    /// Entity-level counterpart of [`DocumentStoreError::DocumentNotFound`].
    #[error("Unable to find {entity} with {property} = {id}")]
    EntityNotFound {
        /// Name of the entity store.
        entity: String,
        /// Name of the identity property.
        property: String,
        /// The identity value that was looked up.
        id: String,
    },
    /// The query could not be interpreted (for example a `$in` operand that is not a list).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The value handed to an engine is not a record (a JSON object).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Schema validation reported one or more field violations.
    #[error("Invalid entity: {0}")]
    Validation(ValidationErrors),
    /// A hook stage refused the value.
    #[error("Rejected: {0}")]
    Rejected(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns the per-field messages if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DocumentStoreError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns true for both the engine-level and entity-level not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::DocumentNotFound { .. } | DocumentStoreError::EntityNotFound { .. }
        )
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<IoError> for DocumentStoreError {
    fn from(err: IoError) -> Self {
        DocumentStoreError::Io(err.to_string())
    }
}

/// A failed operation together with the value the caller originally supplied.
///
/// Pipelines return the untransformed input here, and the entity store returns the
/// caller's unprocessed record, never a partially transformed or stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection<T> {
    /// The error that aborted the operation.
    pub error: DocumentStoreError,
    /// The value as it was before any processing.
    pub original: T,
}

impl<T> Rejection<T> {
    pub fn new(error: DocumentStoreError, original: T) -> Self {
        Self { error, original }
    }

    /// Discards the original value, keeping only the error.
    pub fn into_error(self) -> DocumentStoreError {
        self.error
    }
}

impl<T> fmt::Display for Rejection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> StdError for Rejection<T> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}
