//! Tag storage on SQLite
//!
//! - [`associations`]: which join table backs each context
//! - [`store`]: the per-transaction [`campus_core::TagTransaction`]
//! - [`backend`]: [`SqliteTagBackend`], opening `BEGIN IMMEDIATE` transactions

pub mod associations;
pub mod backend;
pub mod store;

pub use associations::{AssociationTable, SqliteAssociations};
pub use backend::SqliteTagBackend;
pub use store::SqliteTagTransaction;

use crate::error::SqliteError;
use campus_core::TagResult;

/// Convert a rusqlite result into the service error type
fn lift<T>(result: rusqlite::Result<T>) -> TagResult<T> {
    result.map_err(|e| SqliteError::from(e).into())
}
