//! Tag domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// ============================================================================
// Identities
// ============================================================================

/// Tag identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a tagged resource (post, space, project, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Back-office user recorded as the actor of an audit entry
pub type UserId = i64;

// ============================================================================
// Context
// ============================================================================

/// Namespace a tag belongs to
///
/// Uses `Cow<'static, str>` so the well-known contexts below cost no
/// allocation while arbitrary contexts are still accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagContext(pub Cow<'static, str>);

impl TagContext {
    pub const POSTS: TagContext = TagContext(Cow::Borrowed("posts"));
    pub const ATTACHMENTS: TagContext = TagContext(Cow::Borrowed("attachments"));
    pub const LABS: TagContext = TagContext(Cow::Borrowed("labs"));
    pub const CLASSROOMS: TagContext = TagContext(Cow::Borrowed("classrooms"));
    pub const SPACES: TagContext = TagContext(Cow::Borrowed("spaces"));
    pub const PROGRAMS: TagContext = TagContext(Cow::Borrowed("programs"));
    pub const PROJECTS: TagContext = TagContext(Cow::Borrowed("projects"));

    /// Contexts whose resources carry tag associations
    pub const ASSOCIATED: [TagContext; 5] = [
        Self::POSTS,
        Self::LABS,
        Self::CLASSROOMS,
        Self::SPACES,
        Self::PROJECTS,
    ];

    pub fn new(context: impl Into<String>) -> Self {
        Self(Cow::Owned(context.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TagContext {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TagContext {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Tag
// ============================================================================

/// A tag as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub context: TagContext,
    pub name: String,
    pub name_en: Option<String>,
    /// Always lowercase
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully resolved row handed to [`crate::TagStore::insert_tag`]
#[derive(Debug, Clone, PartialEq)]
pub struct TagDraft {
    pub context: TagContext,
    pub name: String,
    pub name_en: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl TagDraft {
    /// Active draft with no optional attributes
    pub fn new(context: TagContext, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            name_en: None,
            slug: slug.into(),
            description: None,
            color: None,
            is_active: true,
            sort_order: 0,
            last_used_at: None,
        }
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }
}

/// Input for [`crate::TagService::create_tag`]; the slug is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTag {
    pub context: TagContext,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewTag {
    pub fn new(context: impl Into<TagContext>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
            name_en: None,
            description: None,
            color: None,
            is_active: true,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Replacement values for [`crate::TagService::update_tag`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagUpdate {
    pub name: String,
    pub name_en: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
}

impl TagUpdate {
    /// Start from the tag's current values
    pub fn from_tag(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            name_en: tag.name_en.clone(),
            description: tag.description.clone(),
            color: tag.color.clone(),
            is_active: tag.is_active,
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Activity filter for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    #[default]
    All,
    Active,
    Inactive,
}

impl TagStatus {
    pub fn matches(self, tag: &Tag) -> bool {
        match self {
            Self::All => true,
            Self::Active => tag.is_active,
            Self::Inactive => !tag.is_active,
        }
    }
}

/// Listing filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagQuery {
    pub context: Option<TagContext>,
    pub status: TagStatus,
    /// Case-insensitive substring of name, English name or slug
    pub keyword: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for TagQuery {
    fn default() -> Self {
        Self {
            context: None,
            status: TagStatus::All,
            keyword: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl TagQuery {
    pub const DEFAULT_LIMIT: usize = 15;
    pub const MIN_LIMIT: usize = 5;
    pub const MAX_LIMIT: usize = 100;

    pub fn for_context(context: impl Into<TagContext>) -> Self {
        Self {
            context: Some(context.into()),
            ..Self::default()
        }
    }

    /// Limit clamped to the accepted page size range
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(Self::MIN_LIMIT, Self::MAX_LIMIT)
    }

    /// Lowercased, trimmed keyword; `None` when blank
    pub fn keyword_pattern(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }
}

/// A tag with the number of resources currently linked to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagUsage {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: u64,
}
