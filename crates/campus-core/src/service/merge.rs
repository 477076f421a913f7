//! Merging tags into a surviving target

use crate::audit::{AuditAction, NewAuditEntry};
use crate::error::{TagError, TagResult};
use crate::storage::{AssociationStore, TagTransaction};
use crate::types::{ResourceId, Tag, TagId, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

/// Counts reported by a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Distinct resources that were linked to at least one source
    pub affected_resources: usize,
    /// Sources that were active and got deactivated
    pub deactivated_tags: usize,
}

/// Sources in first-seen order, without repeats or the target itself
pub(super) fn effective_sources(target_id: TagId, source_ids: &[TagId]) -> Vec<TagId> {
    let mut seen = BTreeSet::new();
    source_ids
        .iter()
        .copied()
        .filter(|id| *id != target_id && seen.insert(*id))
        .collect()
}

pub(super) fn merge_in(
    tx: &mut dyn TagTransaction,
    target_id: TagId,
    source_ids: &[TagId],
    actor: Option<UserId>,
) -> TagResult<MergeOutcome> {
    let mut target = tx
        .tags()
        .tag(target_id)?
        .ok_or_else(|| TagError::tag_not_found(target_id))?;

    if source_ids.is_empty() {
        debug!("Only the target was given; nothing to merge");
        return Ok(MergeOutcome::default());
    }

    let mut sources = Vec::with_capacity(source_ids.len());
    for id in source_ids {
        let source = tx.tags().tag(*id)?.ok_or_else(|| TagError::tag_not_found(*id))?;
        if source.context != target.context {
            return Err(TagError::invalid_argument(format!(
                "contexts differ: tag {} is in '{}' but target {} is in '{}'",
                source.id, source.context, target.id, target.context
            )));
        }
        sources.push(source);
    }

    let affected_resources = match tx.associations(&target.context) {
        Some(mut links) => reassign(links.as_mut(), target.id, &sources)?,
        None => 0,
    };

    let now = Utc::now();
    target.last_used_at = Some(now);
    target.updated_at = now;
    tx.tags().save_tag(&target)?;

    let mut deactivated_tags = 0;
    for mut source in sources {
        if !source.is_active {
            continue;
        }
        source.is_active = false;
        source.last_used_at.get_or_insert(now);
        source.updated_at = now;
        tx.tags().save_tag(&source)?;
        deactivated_tags += 1;
    }

    tx.audit().record(NewAuditEntry::for_tag(
        actor,
        AuditAction::TagMerged,
        &target,
        json!({
            "target_id": target.id,
            "source_ids": source_ids,
            "context": target.context,
            "affected_resources": affected_resources,
            "deactivated": deactivated_tags,
        }),
    ))?;

    Ok(MergeOutcome {
        affected_resources,
        deactivated_tags,
    })
}

/// Move every link of the sources onto the target; returns distinct resources
fn reassign(links: &mut dyn AssociationStore, target: TagId, sources: &[Tag]) -> TagResult<usize> {
    let mut affected: BTreeSet<ResourceId> = BTreeSet::new();

    for source in sources {
        for resource in links.resources_for_tag(source.id)? {
            links.attach(resource, target)?;
            links.detach(resource, source.id)?;
            affected.insert(resource);
        }
        // Out-of-context rows in a shared table must not outlive the source
        let stray = links.detach_tag(source.id)?;
        if stray > 0 {
            debug!(source = %source.id, stray, "Dropped links outside the merge context");
        }
    }

    Ok(affected.len())
}
