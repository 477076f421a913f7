//! Tag rows and audit entries inside one SQLite transaction

use super::associations::{AssociationTable, SqliteAssociations};
use super::lift;
use crate::error::{SqliteError, SqliteResult};
use campus_core::normalize::name_key;
use campus_core::{
    AssociationStore, AuditEntry, AuditSink, NewAuditEntry, Tag, TagContext, TagDraft, TagError,
    TagId, TagQuery, TagResult, TagStatus, TagStore, TagTransaction, TagUsage,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

const TAG_COLUMNS: &str = "t.id, t.context, t.name, t.name_en, t.slug, t.description, t.color, \
                           t.is_active, t.sort_order, t.last_used_at, t.created_at, t.updated_at";

/// [`TagTransaction`] bound to an open rusqlite transaction
pub struct SqliteTagTransaction<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTagTransaction<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, filter: &str, context: &TagContext, value: &str) -> TagResult<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.context = ?1 AND {filter}");
        lift(
            self.conn
                .query_row(&sql, params![context.as_str(), value], row_to_tag)
                .optional(),
        )
    }
}

/// Map a unique violation to a conflict naming the tag
fn write_error(err: rusqlite::Error, name: &str, context: &TagContext) -> TagError {
    let err = SqliteError::from(err);
    if err.is_constraint_violation() {
        TagError::conflict(format!(
            "'{}' collides with an existing tag in context '{}'",
            name, context
        ))
    } else {
        err.into()
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|at| at.to_rfc3339())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    let context: String = row.get(1)?;
    let last_used_at: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Tag {
        id: TagId(row.get(0)?),
        context: TagContext::new(context),
        name: row.get(2)?,
        name_en: row.get(3)?,
        slug: row.get(4)?,
        description: row.get(5)?,
        color: row.get(6)?,
        is_active: row.get(7)?,
        sort_order: row.get(8)?,
        last_used_at: last_used_at.as_deref().and_then(parse_timestamp),
        created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_timestamp(&updated_at).unwrap_or_else(Utc::now),
    })
}

/// `%keyword%` with LIKE wildcards escaped by `\`
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn list_sql() -> String {
    let usage: Vec<String> = AssociationTable::ALL
        .iter()
        .map(|table| format!("WHEN '{}' THEN {}", table.context, table.usage_sql()))
        .collect();

    format!(
        "SELECT {TAG_COLUMNS}, CASE t.context {usage} ELSE 0 END AS usage_count
         FROM tags t
         WHERE (?1 IS NULL OR t.context = ?1)
           AND (?2 IS NULL OR t.is_active = ?2)
           AND (?3 IS NULL
                OR t.name_key LIKE ?3 ESCAPE '\\'
                OR t.slug LIKE ?3 ESCAPE '\\'
                OR lower(t.name_en) LIKE ?3 ESCAPE '\\')
         ORDER BY t.is_active DESC, usage_count DESC, t.name ASC
         LIMIT ?4 OFFSET ?5",
        usage = usage.join(" ")
    )
}

fn query_usage(conn: &Connection, query: &TagQuery) -> rusqlite::Result<Vec<TagUsage>> {
    let status = match query.status {
        TagStatus::All => None,
        TagStatus::Active => Some(true),
        TagStatus::Inactive => Some(false),
    };
    let keyword = query.keyword_pattern().map(|k| like_pattern(&k));

    let mut stmt = conn.prepare(&list_sql())?;
    let rows = stmt
        .query_map(
            params![
                query.context.as_ref().map(TagContext::as_str),
                status,
                keyword,
                query.effective_limit() as i64,
                query.offset as i64,
            ],
            |row| {
                Ok(TagUsage {
                    tag: row_to_tag(row)?,
                    usage_count: row.get::<_, i64>(12)?.max(0) as u64,
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl TagStore for SqliteTagTransaction<'_> {
    fn tag(&self, id: TagId) -> TagResult<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.id = ?1");
        lift(self.conn.query_row(&sql, [id.0], row_to_tag).optional())
    }

    fn find_by_name(&self, context: &TagContext, name: &str) -> TagResult<Option<Tag>> {
        self.find_one("t.name_key = ?2", context, &name_key(name))
    }

    fn find_by_slug(&self, context: &TagContext, slug: &str) -> TagResult<Option<Tag>> {
        self.find_one("t.slug = ?2", context, &slug.to_lowercase())
    }

    fn insert_tag(&mut self, draft: TagDraft) -> TagResult<Tag> {
        let now = Utc::now();
        let slug = draft.slug.to_lowercase();

        self.conn
            .execute(
                "INSERT INTO tags (context, name, name_key, name_en, slug, description, color,
                                   is_active, sort_order, last_used_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    draft.context.as_str(),
                    draft.name,
                    name_key(&draft.name),
                    draft.name_en,
                    slug,
                    draft.description,
                    draft.color,
                    draft.is_active,
                    draft.sort_order,
                    timestamp(draft.last_used_at),
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| write_error(e, &draft.name, &draft.context))?;

        Ok(Tag {
            id: TagId(self.conn.last_insert_rowid()),
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
        })
    }

    fn save_tag(&mut self, tag: &Tag) -> TagResult<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE tags
                 SET name = ?2, name_key = ?3, name_en = ?4, slug = ?5, description = ?6,
                     color = ?7, is_active = ?8, sort_order = ?9, last_used_at = ?10,
                     updated_at = ?11
                 WHERE id = ?1",
                params![
                    tag.id.0,
                    tag.name,
                    name_key(&tag.name),
                    tag.name_en,
                    tag.slug.to_lowercase(),
                    tag.description,
                    tag.color,
                    tag.is_active,
                    tag.sort_order,
                    timestamp(tag.last_used_at),
                    tag.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| write_error(e, &tag.name, &tag.context))?;

        if updated == 0 {
            return Err(TagError::tag_not_found(tag.id));
        }
        Ok(())
    }

    fn list_tags(&self, query: &TagQuery) -> TagResult<Vec<TagUsage>> {
        lift(query_usage(self.conn, query))
    }
}

impl AuditSink for SqliteTagTransaction<'_> {
    fn record(&mut self, entry: NewAuditEntry) -> TagResult<AuditEntry> {
        let now = Utc::now();
        let properties = serde_json::to_string(&entry.properties)?;

        lift(self.conn.execute(
            "INSERT INTO audit_entries
                (actor_id, action, subject_type, subject_id, description, properties, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.actor_id,
                entry.action.as_str(),
                entry.subject_type,
                entry.subject_id,
                entry.description,
                properties,
                now.to_rfc3339(),
            ],
        ))?;

        Ok(AuditEntry::from_new(self.conn.last_insert_rowid(), entry, now))
    }
}

impl TagTransaction for SqliteTagTransaction<'_> {
    fn tags(&mut self) -> &mut dyn TagStore {
        self
    }

    fn associations(&mut self, context: &TagContext) -> Option<Box<dyn AssociationStore + '_>> {
        AssociationTable::for_context(context).map(|table| {
            Box::new(SqliteAssociations::new(self.conn, table)) as Box<dyn AssociationStore + '_>
        })
    }

    fn audit(&mut self) -> &mut dyn AuditSink {
        self
    }
}

/// Read back the audit log, oldest first
pub(crate) fn load_audit_entries(conn: &Connection) -> SqliteResult<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, actor_id, action, subject_type, subject_id, description, properties, created_at
         FROM audit_entries
         ORDER BY id",
    )?;

    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    raw.into_iter()
        .map(
            |(id, actor_id, action, subject_type, subject_id, description, properties, created_at)|
             -> SqliteResult<AuditEntry> {
                Ok(AuditEntry {
                    id,
                    actor_id,
                    action,
                    subject_type,
                    subject_id,
                    description,
                    properties: serde_json::from_str(&properties)?,
                    created_at: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
                })
            },
        )
        .collect()
}
