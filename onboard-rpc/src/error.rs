//! Error types for the RPC layer.

use std::io;

use onboard_service::{ErrorKind, ServiceError};
use thiserror::Error;

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur on an RPC connection.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Network error.
    #[error("network error: {0}")]
    Io(#[from] io::Error),

    /// A frame body was not valid JSON for the expected message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A frame exceeded the size limit.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// The peer answered with a message that does not fit the call.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer closed the connection before answering.
    #[error("connection closed")]
    Closed,

    /// The call failed on the server.
    #[error("{} (code {}): {}", .0.kind(), .0.code(), .0.message())]
    Status(ServiceError),
}

impl RpcError {
    /// The server-side failure kind, if the call reached the server.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RpcError::Status(err) => Some(err.kind()),
            _ => None,
        }
    }
}
