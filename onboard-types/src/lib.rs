//! Core identifier types for onboard.
//!
//! Every stored document is addressed by an [`ObjectId`]: a 12-byte value
//! generated on insert and exchanged as a 24-character hex string.

mod ids;

pub use ids::{OBJECT_ID_LEN, ObjectId};

/// Errors produced while parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid object id {input:?}: expected 24 hex characters, got {len}")]
    InvalidLength { input: String, len: usize },

    #[error("invalid object id {0:?}: not a hex string")]
    InvalidHex(String),
}
