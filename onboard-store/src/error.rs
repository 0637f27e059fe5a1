//! Error types for the store layer.

use std::time::Duration;

use onboard_types::{IdError, ObjectId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No document with this id.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: ObjectId },

    /// Identifier could not be parsed.
    #[error(transparent)]
    InvalidId(#[from] IdError),

    /// The operation ran past its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backing medium cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Returns true if this error means the deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }

    /// Returns true if this error means no document matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
