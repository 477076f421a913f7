//! In-memory tag backend
//!
//! Transactions run against a copy of the state under a single lock; the copy
//! replaces the live state only when the unit of work returns `Ok`. Used by
//! unit tests and for embedding the service without a database.
//!
//! Links are kept per context. Labs, classrooms and spaces model one shared
//! table: a link filed under any of them is removed by
//! [`AssociationStore::detach_tag`] on the others, but space types are not
//! tracked, so a link is only listed under the context it was seeded in.

use super::{AssociationStore, AuditSink, TagBackend, TagStore, TagTransaction};
use crate::audit::{AuditEntry, NewAuditEntry};
use crate::error::{TagError, TagResult};
use crate::normalize::name_key;
use crate::types::{ResourceId, Tag, TagContext, TagDraft, TagId, TagQuery, TagUsage};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type LinkSet = BTreeSet<(ResourceId, TagId)>;

#[derive(Debug, Clone)]
struct MemoryState {
    tags: BTreeMap<TagId, Tag>,
    next_tag_id: i64,
    links: BTreeMap<TagContext, LinkSet>,
    audit: Vec<AuditEntry>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            tags: BTreeMap::new(),
            next_tag_id: 1,
            links: TagContext::ASSOCIATED
                .into_iter()
                .map(|context| (context, LinkSet::new()))
                .collect(),
            audit: Vec::new(),
        }
    }
}

/// Thread-safe in-memory implementation of [`TagBackend`]
#[derive(Clone, Default)]
pub struct MemoryTagBackend {
    state: Arc<Mutex<MemoryState>>,
    fail_audit: Arc<AtomicBool>,
}

impl MemoryTagBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every audit write fail, to exercise rollback
    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Insert a tag outside any service operation
    pub fn seed_tag(&self, draft: TagDraft) -> TagResult<Tag> {
        let mut state = self.state.lock();
        insert(&mut state, draft)
    }

    /// Link a resource outside any service operation
    pub fn seed_link(&self, context: &TagContext, resource_id: ResourceId, tag_id: TagId) {
        self.state
            .lock()
            .links
            .entry(context.clone())
            .or_default()
            .insert((resource_id, tag_id));
    }

    pub fn tag(&self, id: TagId) -> Option<Tag> {
        self.state.lock().tags.get(&id).cloned()
    }

    pub fn tags_in(&self, context: &TagContext) -> Vec<Tag> {
        self.state
            .lock()
            .tags
            .values()
            .filter(|tag| &tag.context == context)
            .cloned()
            .collect()
    }

    /// All `(resource, tag)` links of a context
    pub fn links(&self, context: &TagContext) -> Vec<(ResourceId, TagId)> {
        self.state
            .lock()
            .links
            .get(context)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().audit.clone()
    }
}

#[async_trait]
impl TagBackend for MemoryTagBackend {
    async fn transaction<T, F>(&self, work: F) -> TagResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TagTransaction) -> TagResult<T> + Send + 'static,
    {
        let mut live = self.state.lock();
        let mut draft = live.clone();

        let result = {
            let mut tx = MemoryTransaction {
                state: &mut draft,
                fail_audit: self.fail_audit.load(Ordering::SeqCst),
            };
            work(&mut tx)
        };

        if result.is_ok() {
            *live = draft;
        }
        result
    }
}

fn insert(state: &mut MemoryState, draft: TagDraft) -> TagResult<Tag> {
    let key = name_key(&draft.name);
    let slug = draft.slug.to_lowercase();

    let clash = state.tags.values().find(|tag| {
        tag.context == draft.context && (name_key(&tag.name) == key || tag.slug == slug)
    });
    if let Some(existing) = clash {
        return Err(TagError::conflict(format!(
            "'{}' collides with tag {} in context '{}'",
            draft.name, existing.id, draft.context
        )));
    }

    let now = Utc::now();
    let tag = Tag {
        id: TagId(state.next_tag_id),
        context: draft.context,
        name: draft.name,
        name_en: draft.name_en,
        slug,
        description: draft.description,
        color: draft.color,
        is_active: draft.is_active,
        sort_order: draft.sort_order,
        last_used_at: draft.last_used_at,
        created_at: now,
        updated_at: now,
    };
    state.next_tag_id += 1;
    state.tags.insert(tag.id, tag.clone());
    Ok(tag)
}

struct MemoryTransaction<'a> {
    state: &'a mut MemoryState,
    fail_audit: bool,
}

impl TagStore for MemoryTransaction<'_> {
    fn tag(&self, id: TagId) -> TagResult<Option<Tag>> {
        Ok(self.state.tags.get(&id).cloned())
    }

    fn find_by_name(&self, context: &TagContext, name: &str) -> TagResult<Option<Tag>> {
        let key = name_key(name);
        Ok(self
            .state
            .tags
            .values()
            .find(|tag| &tag.context == context && name_key(&tag.name) == key)
            .cloned())
    }

    fn find_by_slug(&self, context: &TagContext, slug: &str) -> TagResult<Option<Tag>> {
        let slug = slug.to_lowercase();
        Ok(self
            .state
            .tags
            .values()
            .find(|tag| &tag.context == context && tag.slug == slug)
            .cloned())
    }

    fn insert_tag(&mut self, draft: TagDraft) -> TagResult<Tag> {
        insert(self.state, draft)
    }

    fn save_tag(&mut self, tag: &Tag) -> TagResult<()> {
        let key = name_key(&tag.name);
        let clash = self.state.tags.values().any(|other| {
            other.id != tag.id
                && other.context == tag.context
                && (name_key(&other.name) == key || other.slug == tag.slug)
        });
        if clash {
            return Err(TagError::conflict(format!(
                "'{}' collides with another tag in context '{}'",
                tag.name, tag.context
            )));
        }

        match self.state.tags.get_mut(&tag.id) {
            Some(stored) => {
                *stored = tag.clone();
                Ok(())
            }
            None => Err(TagError::tag_not_found(tag.id)),
        }
    }

    fn list_tags(&self, query: &TagQuery) -> TagResult<Vec<TagUsage>> {
        let keyword = query.keyword_pattern();

        let mut rows: Vec<TagUsage> = self
            .state
            .tags
            .values()
            .filter(|tag| query.context.as_ref().map_or(true, |c| &tag.context == c))
            .filter(|tag| query.status.matches(tag))
            .filter(|tag| {
                keyword.as_deref().map_or(true, |k| {
                    tag.name.to_lowercase().contains(k)
                        || tag.slug.contains(k)
                        || tag
                            .name_en
                            .as_deref()
                            .is_some_and(|en| en.to_lowercase().contains(k))
                })
            })
            .map(|tag| TagUsage {
                usage_count: self
                    .state
                    .links
                    .get(&tag.context)
                    .map_or(0, |links| links.iter().filter(|(_, t)| *t == tag.id).count() as u64),
                tag: tag.clone(),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.tag
                .is_active
                .cmp(&a.tag.is_active)
                .then(b.usage_count.cmp(&a.usage_count))
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.effective_limit())
            .collect())
    }
}

impl AuditSink for MemoryTransaction<'_> {
    fn record(&mut self, entry: NewAuditEntry) -> TagResult<AuditEntry> {
        if self.fail_audit {
            return Err(TagError::transaction("audit sink unavailable"));
        }
        let id = self.state.audit.len() as i64 + 1;
        let stored = AuditEntry::from_new(id, entry, Utc::now());
        self.state.audit.push(stored.clone());
        Ok(stored)
    }
}

impl TagTransaction for MemoryTransaction<'_> {
    fn tags(&mut self) -> &mut dyn TagStore {
        self
    }

    fn associations(&mut self, context: &TagContext) -> Option<Box<dyn AssociationStore + '_>> {
        if !self.state.links.contains_key(context) {
            return None;
        }
        Some(Box::new(MemoryAssociations {
            links: &mut self.state.links,
            context: context.clone(),
        }))
    }

    fn audit(&mut self) -> &mut dyn AuditSink {
        self
    }
}

/// Contexts stored in the same table as `context`, itself included
fn table_mates(context: &TagContext) -> Vec<TagContext> {
    let spaces = [TagContext::LABS, TagContext::CLASSROOMS, TagContext::SPACES];
    if spaces.contains(context) {
        spaces.to_vec()
    } else {
        vec![context.clone()]
    }
}

struct MemoryAssociations<'a> {
    links: &'a mut BTreeMap<TagContext, LinkSet>,
    context: TagContext,
}

impl MemoryAssociations<'_> {
    fn own(&mut self) -> &mut LinkSet {
        self.links.entry(self.context.clone()).or_default()
    }
}

impl AssociationStore for MemoryAssociations<'_> {
    fn resources_for_tag(&self, tag_id: TagId) -> TagResult<Vec<ResourceId>> {
        Ok(self
            .links
            .get(&self.context)
            .into_iter()
            .flatten()
            .filter(|(_, tag)| *tag == tag_id)
            .map(|(resource, _)| *resource)
            .collect())
    }

    fn attach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool> {
        Ok(self.own().insert((resource_id, tag_id)))
    }

    fn detach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool> {
        Ok(self.own().remove(&(resource_id, tag_id)))
    }

    fn detach_tag(&mut self, tag_id: TagId) -> TagResult<usize> {
        let mut removed = 0;
        for context in table_mates(&self.context) {
            if let Some(links) = self.links.get_mut(&context) {
                let before = links.len();
                links.retain(|(_, tag)| *tag != tag_id);
                removed += before - links.len();
            }
        }
        Ok(removed)
    }
}
