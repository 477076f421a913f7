//! Append-only audit records for back-office tag actions

use crate::types::{Tag, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// `subject_type` written for tag entries
pub const TAG_SUBJECT: &str = "tag";

/// Recorded tag actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "tag.created")]
    TagCreated,
    #[serde(rename = "tag.updated")]
    TagUpdated,
    #[serde(rename = "tag.deactivated")]
    TagDeactivated,
    #[serde(rename = "tag.merged")]
    TagMerged,
    #[serde(rename = "tag.split")]
    TagSplit,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TagCreated => "tag.created",
            Self::TagUpdated => "tag.updated",
            Self::TagDeactivated => "tag.deactivated",
            Self::TagMerged => "tag.merged",
            Self::TagSplit => "tag.split",
        }
    }

    /// Human label, e.g. "Tag merged"
    pub fn label(self) -> String {
        let words = self.as_str().replace(['.', '_'], " ");
        let mut chars = words.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub actor_id: Option<UserId>,
    pub action: AuditAction,
    pub subject_type: String,
    pub subject_id: i64,
    pub description: Option<String>,
    pub properties: Value,
}

impl NewAuditEntry {
    /// Entry about a tag, described as "<label> · <tag name>"
    pub fn for_tag(actor_id: Option<UserId>, action: AuditAction, tag: &Tag, properties: Value) -> Self {
        Self {
            actor_id,
            action,
            subject_type: TAG_SUBJECT.to_string(),
            subject_id: tag.id.0,
            description: Some(format!("{} · {}", action.label(), tag.name)),
            properties,
        }
    }
}

/// A stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: Option<UserId>,
    pub action: String,
    pub subject_type: String,
    pub subject_id: i64,
    pub description: Option<String>,
    pub properties: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_new(id: i64, entry: NewAuditEntry, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            actor_id: entry.actor_id,
            action: entry.action.as_str().to_string(),
            subject_type: entry.subject_type,
            subject_id: entry.subject_id,
            description: entry.description,
            properties: entry.properties,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_labels() {
        assert_eq!(AuditAction::TagMerged.label(), "Tag merged");
        assert_eq!(AuditAction::TagSplit.as_str(), "tag.split");
    }

    #[test]
    fn test_action_serde_uses_dotted_names() {
        let json = serde_json::to_string(&AuditAction::TagDeactivated).unwrap();
        assert_eq!(json, "\"tag.deactivated\"");
    }
}
