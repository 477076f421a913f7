//! Tag service
//!
//! Business rules for the tag taxonomy. Every public operation runs as one
//! [`TagBackend::transaction`]; the rule implementations in the submodules are
//! plain functions over a [`crate::TagTransaction`] so they can be exercised
//! against any backend.

mod lifecycle;
mod merge;
mod split;

use crate::error::{TagError, TagResult};
use crate::normalize::normalize_names;
use crate::storage::TagBackend;
use crate::types::{NewTag, Tag, TagContext, TagId, TagQuery, TagUpdate, TagUsage, UserId};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub use merge::MergeOutcome;
pub use split::SplitOutcome;

/// Tag lifecycle service
pub struct TagService<B> {
    backend: Arc<B>,
}

impl<B> Clone for TagService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

/// Arguments of a split, owned by the unit of work
#[derive(Debug, Clone)]
struct SplitPlan {
    tag_id: TagId,
    names: Vec<String>,
    keep_original: bool,
    color: Option<String>,
    actor: Option<UserId>,
}

impl<B: TagBackend> TagService<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fold `source_ids` into `target_id`.
    ///
    /// Links of the sources are moved to the target without duplicates, active
    /// sources are deactivated and one `tag.merged` entry is recorded. Repeated
    /// ids and the target itself are ignored; when nothing is left the call is
    /// a no-op returning zero counts.
    #[instrument(skip(self, source_ids), fields(target = %target_id, sources = source_ids.len()))]
    pub async fn merge_tags(
        &self,
        target_id: TagId,
        source_ids: &[TagId],
        actor: Option<UserId>,
    ) -> TagResult<MergeOutcome> {
        if source_ids.is_empty() {
            return Err(TagError::invalid_argument("source_ids must not be empty"));
        }

        let sources = merge::effective_sources(target_id, source_ids);
        let outcome = self
            .backend
            .transaction(move |tx| merge::merge_in(tx, target_id, &sources, actor))
            .await?;

        info!(
            affected_resources = outcome.affected_resources,
            deactivated_tags = outcome.deactivated_tags,
            "Merged tags"
        );
        Ok(outcome)
    }

    /// Create one tag per new name in the context of `tag`.
    ///
    /// Names already used by an active tag of the context (by name or slug)
    /// are skipped. When `keep_original` is false the original is deactivated.
    /// `color` defaults to the original tag's color.
    #[instrument(skip(self, tag, new_names, color), fields(tag = %tag.id, context = %tag.context))]
    pub async fn split_tag<I, S>(
        &self,
        tag: &Tag,
        new_names: I,
        keep_original: bool,
        color: Option<String>,
        actor: Option<UserId>,
    ) -> TagResult<SplitOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = normalize_names(new_names);
        if names.is_empty() {
            return Err(TagError::invalid_argument(
                "at least one non-empty tag name is required",
            ));
        }

        let plan = SplitPlan {
            tag_id: tag.id,
            names,
            keep_original,
            color,
            actor,
        };
        let outcome = self
            .backend
            .transaction(move |tx| split::split_in(tx, plan))
            .await?;

        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            deactivated_original = outcome.deactivated_original,
            "Split tag"
        );
        Ok(outcome)
    }

    /// Create a tag with a generated slug
    #[instrument(skip(self, new_tag), fields(context = %new_tag.context))]
    pub async fn create_tag(&self, new_tag: NewTag, actor: Option<UserId>) -> TagResult<Tag> {
        let tag = self
            .backend
            .transaction(move |tx| lifecycle::create_in(tx, new_tag, actor))
            .await?;
        info!(tag = %tag.id, slug = %tag.slug, "Created tag");
        Ok(tag)
    }

    /// Replace a tag's editable attributes; a rename regenerates the slug
    #[instrument(skip(self, update), fields(tag = %id))]
    pub async fn update_tag(&self, id: TagId, update: TagUpdate, actor: Option<UserId>) -> TagResult<Tag> {
        self.backend
            .transaction(move |tx| lifecycle::update_in(tx, id, update, actor))
            .await
    }

    /// Soft-delete a tag
    #[instrument(skip(self), fields(tag = %id))]
    pub async fn deactivate_tag(&self, id: TagId, actor: Option<UserId>) -> TagResult<Tag> {
        self.backend
            .transaction(move |tx| lifecycle::deactivate_in(tx, id, actor))
            .await
    }

    /// Tag named `name` in `context`, created on first use.
    ///
    /// Returns `None` for a blank name.
    pub async fn find_or_create(&self, context: TagContext, name: &str) -> TagResult<Option<Tag>> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Ok(None);
        }
        self.backend
            .transaction(move |tx| lifecycle::find_or_create_in(tx, &context, &name).map(Some))
            .await
    }

    /// Make sure every name exists in every context; returns how many tags
    /// were created
    #[instrument(skip_all, fields(contexts = contexts.len()))]
    pub async fn register_names<I, S>(&self, names: I, contexts: &[TagContext]) -> TagResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = normalize_names(names);
        if names.is_empty() || contexts.is_empty() {
            debug!("Nothing to register");
            return Ok(0);
        }

        let contexts = contexts.to_vec();
        let created = self
            .backend
            .transaction(move |tx| lifecycle::register_in(tx, &names, &contexts))
            .await?;

        if created > 0 {
            info!(created, "Registered tags");
        }
        Ok(created)
    }

    /// Tags with usage counts, active first then most used
    pub async fn list_tags(&self, query: TagQuery) -> TagResult<Vec<TagUsage>> {
        self.backend
            .transaction(move |tx| tx.tags().list_tags(&query))
            .await
    }

    /// Get a tag by id
    pub async fn get_tag(&self, id: TagId) -> TagResult<Tag> {
        self.backend
            .transaction(move |tx| tx.tags().tag(id)?.ok_or_else(|| TagError::tag_not_found(id)))
            .await
    }
}
