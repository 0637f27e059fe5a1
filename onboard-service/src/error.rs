//! Error classification shared by every transport.

use std::fmt;

use onboard_cache::CacheError;
use onboard_model::ValidationError;
use onboard_store::StoreError;
use onboard_types::IdError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Client-visible failure categories.
///
/// Numeric codes follow the conventional RPC status numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    DeadlineExceeded,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::InvalidArgument => 3,
            ErrorKind::DeadlineExceeded => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::Internal => 13,
            ErrorKind::Unavailable => 14,
        }
    }

    /// HTTP status answering a request that failed with this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
            ErrorKind::DeadlineExceeded => 504,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::DeadlineExceeded => "DeadlineExceeded",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified service failure with a client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Malformed id, undecodable payload or failed validation.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// A store or cache call ran past its deadline.
    #[error("{0}")]
    DeadlineExceeded(String),

    /// A backend could not be reached.
    #[error("{0}")]
    Unavailable(String),

    /// Anything unexpected. The message keeps the underlying cause.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Rebuilds an error from its kind and message, as carried over the wire.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidArgument => ServiceError::InvalidArgument(message),
            ErrorKind::NotFound => ServiceError::NotFound(message),
            ErrorKind::DeadlineExceeded => ServiceError::DeadlineExceeded(message),
            ErrorKind::Unavailable => ServiceError::Unavailable(message),
            ErrorKind::Internal => ServiceError::Internal(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            ServiceError::Unavailable(_) => ErrorKind::Unavailable,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> u32 {
        self.kind().code()
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::InvalidArgument(m)
            | ServiceError::NotFound(m)
            | ServiceError::DeadlineExceeded(m)
            | ServiceError::Unavailable(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                ServiceError::NotFound(format!("could not find {id} in {collection}"))
            }
            StoreError::InvalidId(e) => ServiceError::InvalidArgument(e.to_string()),
            StoreError::Timeout(_) => ServiceError::DeadlineExceeded(err.to_string()),
            StoreError::Unavailable(_) => ServiceError::Unavailable(err.to_string()),
            StoreError::Database(_) | StoreError::Serialization(_) | StoreError::InvalidData(_) => {
                ServiceError::Internal(format!("unknown internal error: {err}"))
            }
        }
    }
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable(_) => ServiceError::Unavailable(err.to_string()),
            CacheError::Timeout(_) => ServiceError::DeadlineExceeded(err.to_string()),
            CacheError::Serialization(_) => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

impl From<IdError> for ServiceError {
    fn from(err: IdError) -> Self {
        ServiceError::InvalidArgument(format!("could not convert to object id: {err}"))
    }
}
