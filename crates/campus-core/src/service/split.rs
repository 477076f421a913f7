//! Splitting one tag into several new ones

use super::SplitPlan;
use crate::audit::{AuditAction, NewAuditEntry};
use crate::error::{TagError, TagResult};
use crate::normalize::{slugify, unique_slug};
use crate::storage::{TagStore, TagTransaction};
use crate::types::{Tag, TagContext, TagDraft};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// Result of a split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOutcome {
    /// Newly created tags, in input order
    pub created: Vec<Tag>,
    /// Names that already existed in the context and were not recreated
    pub skipped: Vec<String>,
    pub deactivated_original: bool,
}

pub(super) fn split_in(tx: &mut dyn TagTransaction, plan: SplitPlan) -> TagResult<SplitOutcome> {
    let mut original = tx
        .tags()
        .tag(plan.tag_id)?
        .ok_or_else(|| TagError::tag_not_found(plan.tag_id))?;
    let context = original.context.clone();
    let color = plan.color.clone().or_else(|| original.color.clone());

    let mut to_create = Vec::new();
    let mut skipped = Vec::new();
    for name in plan.names {
        if already_available(tx.tags(), &context, &name)? {
            debug!(%name, "Name already available in context");
            skipped.push(name);
        } else {
            to_create.push(name);
        }
    }

    let mut created = Vec::with_capacity(to_create.len());
    for name in to_create {
        let store = tx.tags();
        let slug = unique_slug(&slugify(&name), |candidate| {
            Ok(store.find_by_slug(&context, candidate)?.is_some())
        })?;
        let draft = TagDraft::new(context.clone(), name.clone(), slug).with_color(color.clone());

        match store.insert_tag(draft) {
            Ok(tag) => created.push(tag),
            // A concurrent writer got there first
            Err(TagError::Conflict(reason)) => {
                warn!(%name, %reason, "Tag appeared while splitting; skipping");
                skipped.push(name);
            }
            Err(err) => return Err(err),
        }
    }

    let mut deactivated_original = false;
    if !plan.keep_original && original.is_active {
        original.is_active = false;
        original.updated_at = Utc::now();
        tx.tags().save_tag(&original)?;
        deactivated_original = true;
    }

    let created_ids: Vec<_> = created.iter().map(|tag| tag.id).collect();
    tx.audit().record(NewAuditEntry::for_tag(
        plan.actor,
        AuditAction::TagSplit,
        &original,
        json!({
            "context": context,
            "keep_original": plan.keep_original,
            "created_tag_ids": created_ids,
        }),
    ))?;

    Ok(SplitOutcome {
        created,
        skipped,
        deactivated_original,
    })
}

/// An active tag already answers to `name` (by name or slug), or any tag
/// already owns the name
fn already_available(store: &dyn TagStore, context: &TagContext, name: &str) -> TagResult<bool> {
    if store.find_by_name(context, name)?.is_some() {
        return Ok(true);
    }
    Ok(store
        .find_by_slug(context, &name.to_lowercase())?
        .is_some_and(|tag| tag.is_active))
}
