//! Error types for store operations.

use pathway_core::Fault;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document failed schema validation.
    #[error("{collection} validation failed: {field}: {message}")]
    Validation {
        /// Collection the write targeted.
        collection: &'static str,
        /// Offending field (wire name).
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// A unique index already holds these values.
    #[error("duplicate key in {collection}: {key_value:?}")]
    Duplicate {
        /// Collection the write targeted.
        collection: &'static str,
        /// The conflicting key/value pairs.
        key_value: Map<String, Value>,
    },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// A document could not be converted to or from its stored form.
    #[error("document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a validation error.
    pub fn validation(collection: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            collection,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate-key error.
    pub fn duplicate(collection: &'static str, key_value: Map<String, Value>) -> Self {
        Self::Duplicate { collection, key_value }
    }
}

impl From<StoreError> for Fault {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { field, message, .. } => Fault::invalid_field(field, message),
            StoreError::Duplicate { key_value, .. } => Fault::DuplicateEntry { key_value },
            StoreError::Closed => Fault::unclassified("store is closed"),
            StoreError::Encoding(e) => Fault::unclassified_with_source("document encoding failed", e),
        }
    }
}
