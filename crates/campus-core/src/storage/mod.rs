//! Storage traits consumed by the tag service
//!
//! The traits are split by concern so each backend can map them onto its own
//! tables:
//!
//! - **TagStore**: tag rows, lookups by id / name / slug, listings
//! - **AssociationStore**: resource-tag links of one context
//! - **AuditSink**: append-only audit entries
//! - **TagTransaction**: the three above, bound to one open transaction
//! - **TagBackend**: opens transactions and commits or rolls them back
//!
//! The per-transaction traits are synchronous. A backend runs the whole unit
//! of work on a blocking thread (or under a lock) and only the outer
//! [`TagBackend::transaction`] call is async.

pub mod memory;

use crate::audit::{AuditEntry, NewAuditEntry};
use crate::error::TagResult;
use crate::types::{ResourceId, Tag, TagContext, TagDraft, TagId, TagQuery, TagUsage};
use async_trait::async_trait;

// ============================================================================
// TagStore
// ============================================================================

/// Tag rows within one transaction
pub trait TagStore {
    /// Get a tag by id
    fn tag(&self, id: TagId) -> TagResult<Option<Tag>>;

    /// Case-insensitive name lookup in a context, active or not
    fn find_by_name(&self, context: &TagContext, name: &str) -> TagResult<Option<Tag>>;

    /// Slug lookup in a context, active or not
    fn find_by_slug(&self, context: &TagContext, slug: &str) -> TagResult<Option<Tag>>;

    /// Insert a new row.
    ///
    /// Returns [`crate::TagError::Conflict`] when the lowercase name or the
    /// slug is already used in the context.
    fn insert_tag(&mut self, draft: TagDraft) -> TagResult<Tag>;

    /// Overwrite the mutable columns of an existing row
    fn save_tag(&mut self, tag: &Tag) -> TagResult<()>;

    /// Tags matching the query, with usage counts
    fn list_tags(&self, query: &TagQuery) -> TagResult<Vec<TagUsage>>;
}

// ============================================================================
// AssociationStore
// ============================================================================

/// Resource-tag links of one context (e.g. `post_tag` for "posts")
pub trait AssociationStore {
    /// Resources linked to the tag, ascending
    fn resources_for_tag(&self, tag_id: TagId) -> TagResult<Vec<ResourceId>>;

    /// Link the resource unless already linked; true when a row was added
    fn attach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool>;

    /// Remove a link; true when a row was removed
    fn detach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool>;

    /// Remove every link of the tag from the underlying table, including rows
    /// that belong to other contexts sharing it; returns the rows removed
    fn detach_tag(&mut self, tag_id: TagId) -> TagResult<usize>;
}

// ============================================================================
// AuditSink
// ============================================================================

/// Append-only audit log
pub trait AuditSink {
    fn record(&mut self, entry: NewAuditEntry) -> TagResult<AuditEntry>;
}

// ============================================================================
// Transaction
// ============================================================================

/// Everything an operation may touch, bound to one open transaction
pub trait TagTransaction {
    fn tags(&mut self) -> &mut dyn TagStore;

    /// Association table for the context; `None` for contexts whose
    /// resources carry no tags (merges there rewrite nothing)
    fn associations(&mut self, context: &TagContext) -> Option<Box<dyn AssociationStore + '_>>;

    fn audit(&mut self) -> &mut dyn AuditSink;
}

/// Opens atomic transactions
///
/// `work` either commits entirely (on `Ok`) or leaves no trace (on `Err`).
/// Implementations must serialize concurrent writers so name and slug checks
/// made inside `work` stay valid until commit.
#[async_trait]
pub trait TagBackend: Send + Sync + 'static {
    async fn transaction<T, F>(&self, work: F) -> TagResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TagTransaction) -> TagResult<T> + Send + 'static;
}
