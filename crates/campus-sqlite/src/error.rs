//! Error types for SQLite storage

use campus_core::TagError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl SqliteError {
    /// UNIQUE, PRIMARY KEY, FOREIGN KEY or CHECK failure
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Rusqlite(e) => e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SqliteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SqliteError> for TagError {
    fn from(err: SqliteError) -> Self {
        if err.is_constraint_violation() {
            return Self::Conflict(err.to_string());
        }
        match err {
            SqliteError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Transaction(other.to_string()),
        }
    }
}
