//! Create, rename, deactivate and first-use registration of tags

use crate::audit::{AuditAction, NewAuditEntry};
use crate::error::{TagError, TagResult};
use crate::normalize::{slugify, unique_slug};
use crate::storage::{TagStore, TagTransaction};
use crate::types::{NewTag, Tag, TagContext, TagDraft, TagId, TagUpdate, UserId};
use chrono::Utc;
use serde_json::json;

pub(super) fn create_in(tx: &mut dyn TagTransaction, new_tag: NewTag, actor: Option<UserId>) -> TagResult<Tag> {
    let name = required_name(&new_tag.name)?;

    if let Some(existing) = tx.tags().find_by_name(&new_tag.context, &name)? {
        return Err(TagError::conflict(format!(
            "tag '{}' already exists in context '{}' (id {})",
            existing.name, existing.context, existing.id
        )));
    }

    let slug = free_slug(tx.tags(), &new_tag.context, &name, None)?;
    let draft = TagDraft {
        context: new_tag.context,
        name,
        name_en: new_tag.name_en,
        slug,
        description: new_tag.description,
        color: new_tag.color,
        is_active: new_tag.is_active,
        sort_order: 0,
        last_used_at: new_tag.is_active.then(Utc::now),
    };
    let tag = tx.tags().insert_tag(draft)?;

    tx.audit().record(NewAuditEntry::for_tag(
        actor,
        AuditAction::TagCreated,
        &tag,
        json!({
            "context": tag.context,
            "color": tag.color,
        }),
    ))?;

    Ok(tag)
}

pub(super) fn update_in(
    tx: &mut dyn TagTransaction,
    id: TagId,
    update: TagUpdate,
    actor: Option<UserId>,
) -> TagResult<Tag> {
    let mut tag = tx.tags().tag(id)?.ok_or_else(|| TagError::tag_not_found(id))?;
    let name = required_name(&update.name)?;
    let name_changed = tag.name != name;

    if name_changed {
        if let Some(other) = tx.tags().find_by_name(&tag.context, &name)? {
            if other.id != tag.id {
                return Err(TagError::conflict(format!(
                    "tag '{}' already exists in context '{}' (id {})",
                    other.name, other.context, other.id
                )));
            }
        }
        tag.slug = free_slug(tx.tags(), &tag.context, &name, Some(tag.id))?;
    }

    let now = Utc::now();
    tag.name = name;
    tag.name_en = update.name_en;
    tag.description = update.description;
    tag.color = update.color;
    tag.is_active = update.is_active;
    if tag.is_active && tag.last_used_at.is_none() {
        tag.last_used_at = Some(now);
    }
    tag.updated_at = now;
    tx.tags().save_tag(&tag)?;

    tx.audit().record(NewAuditEntry::for_tag(
        actor,
        AuditAction::TagUpdated,
        &tag,
        json!({
            "name_changed": name_changed,
            "is_active": tag.is_active,
        }),
    ))?;

    Ok(tag)
}

pub(super) fn deactivate_in(tx: &mut dyn TagTransaction, id: TagId, actor: Option<UserId>) -> TagResult<Tag> {
    let mut tag = tx.tags().tag(id)?.ok_or_else(|| TagError::tag_not_found(id))?;

    tag.is_active = false;
    tag.updated_at = Utc::now();
    tx.tags().save_tag(&tag)?;

    tx.audit().record(NewAuditEntry::for_tag(
        actor,
        AuditAction::TagDeactivated,
        &tag,
        json!({ "context": tag.context }),
    ))?;

    Ok(tag)
}

pub(super) fn find_or_create_in(tx: &mut dyn TagTransaction, context: &TagContext, name: &str) -> TagResult<Tag> {
    if let Some(existing) = tx.tags().find_by_name(context, name)? {
        return Ok(existing);
    }
    let slug = free_slug(tx.tags(), context, name, None)?;
    tx.tags().insert_tag(TagDraft::new(context.clone(), name, slug))
}

pub(super) fn register_in(tx: &mut dyn TagTransaction, names: &[String], contexts: &[TagContext]) -> TagResult<usize> {
    let mut created = 0;
    for context in contexts {
        for name in names {
            if tx.tags().find_by_name(context, name)?.is_some() {
                continue;
            }
            let slug = free_slug(tx.tags(), context, name, None)?;
            tx.tags().insert_tag(TagDraft::new(context.clone(), name.as_str(), slug))?;
            created += 1;
        }
    }
    Ok(created)
}

fn required_name(name: &str) -> TagResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::invalid_argument("tag name must not be empty"));
    }
    Ok(name.to_string())
}

/// Unique slug for `name` in the context, ignoring the slug owned by `owner`
fn free_slug(store: &dyn TagStore, context: &TagContext, name: &str, owner: Option<TagId>) -> TagResult<String> {
    unique_slug(&slugify(name), |candidate| {
        Ok(store
            .find_by_slug(context, candidate)?
            .is_some_and(|tag| Some(tag.id) != owner))
    })
}
