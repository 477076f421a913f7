//! Campus tag core
//!
//! Domain model and business rules for the department site's tag taxonomy.
//! Tags are scoped to a [`TagContext`] ("posts", "labs", ...) and attached to
//! resources through one association table per context.
//!
//! ## Architecture
//!
//! The crate follows a dependency inversion layout: [`TagService`] holds the
//! merge/split rules and talks only to the traits in [`storage`]. Backends
//! (the in-memory one in [`storage::memory`], SQLite in `campus-sqlite`)
//! implement [`TagBackend`] and hand the service one atomic
//! [`TagTransaction`] per operation.
//!
//! ```rust,ignore
//! use campus_core::{MemoryTagBackend, TagId, TagService};
//!
//! let service = TagService::new(MemoryTagBackend::new());
//! let outcome = service.merge_tags(TagId(1), &[TagId(2), TagId(3)], None).await?;
//! println!("{} resources retagged", outcome.affected_resources);
//! ```

pub mod audit;
pub mod error;
pub mod normalize;
pub mod service;
pub mod storage;
pub mod types;

pub use audit::{AuditAction, AuditEntry, NewAuditEntry, TAG_SUBJECT};
pub use error::{TagError, TagResult};
pub use service::{MergeOutcome, SplitOutcome, TagService};
pub use storage::memory::MemoryTagBackend;
pub use storage::{AssociationStore, AuditSink, TagBackend, TagStore, TagTransaction};
pub use types::{
    NewTag, ResourceId, Tag, TagContext, TagDraft, TagId, TagQuery, TagStatus, TagUpdate,
    TagUsage, UserId,
};
