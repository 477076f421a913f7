//! Error types for tag operations

use crate::types::TagId;
use thiserror::Error;

/// Error type for tag operations
///
/// Every variant aborts the surrounding transaction; nothing is persisted
/// when an operation returns `Err`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TagError {
    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Cross-context merge or structurally invalid input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Name or slug already taken in the context
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage layer failure, rolled back
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Audit payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for tag operations
pub type TagResult<T> = Result<T, TagError>;

impl TagError {
    /// Missing tag
    pub fn tag_not_found(id: TagId) -> Self {
        Self::NotFound {
            entity: "tag",
            id: id.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a storage/transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        Self::Transaction(msg.into())
    }

    /// Whether re-running the whole operation may succeed.
    ///
    /// Merge and split are safe to repeat (sources stay deactivated, existing
    /// names are skipped), so storage failures are reported as retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}

impl From<serde_json::Error> for TagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
