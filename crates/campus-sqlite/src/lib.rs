//! SQLite storage backend for the campus tag service
//!
//! Implements [`campus_core::TagBackend`] on top of rusqlite.
//!
//! ## Features
//!
//! - **Atomic operations**: every service call runs in one `BEGIN IMMEDIATE`
//!   transaction, committed on success and rolled back on any error
//! - **Per-context associations**: `post_tag`, `space_tag` (filtered by space
//!   type for labs and classrooms) and `project_tag`
//! - **Unique indexes**: lowercase name and slug per context, so concurrent
//!   writers cannot create duplicates
//! - **WAL Mode**: concurrent readers with a single writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use campus_core::{TagId, TagService};
//! use campus_sqlite::{SqliteConfig, SqliteTagBackend};
//!
//! let backend = SqliteTagBackend::open(SqliteConfig::new("./campus.db"))?;
//! let service = TagService::new(backend);
//! service.merge_tags(TagId(1), &[TagId(2)], None).await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod schema;
pub mod tags;

// Re-exports
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use tags::{AssociationTable, SqliteTagBackend};
