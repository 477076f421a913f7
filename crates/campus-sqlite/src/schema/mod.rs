//! Schema management and migrations

use crate::error::{SqliteError, SqliteResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// `spaces.space_type` of a lab
pub const SPACE_TYPE_LAB: i64 = 1;
/// `spaces.space_type` of a classroom
pub const SPACE_TYPE_CLASSROOM: i64 = 2;

/// Apply all pending migrations
pub fn apply_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version = get_current_version(conn)?;
    debug!(current_version, target_version = SCHEMA_VERSION, "Checking migrations");

    if current_version < SCHEMA_VERSION {
        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Applying schema migrations"
        );
        apply_migration_v1(conn)?;
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> SqliteResult<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);

    Ok(version.unwrap_or(0))
}

fn record_migration(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: tags, association tables and the audit log
fn apply_migration_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("Applying migration v1: tags schema");

    conn.execute_batch(SCHEMA_V1)
        .map_err(|e| SqliteError::Schema(format!("Failed to apply v1 schema: {}", e)))?;

    record_migration(conn, 1)?;
    info!("Migration v1 applied successfully");
    Ok(())
}

const SCHEMA_V1: &str = r#"
-- ============================================================================
-- TABLE: tags
-- ============================================================================
-- Context-scoped tags. name_key holds the Unicode-lowercased name; SQLite's
-- lower() only folds ASCII.

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    context TEXT NOT NULL,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    name_en TEXT,
    slug TEXT NOT NULL,
    description TEXT,
    color TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    last_used_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(context, name_key),
    UNIQUE(context, slug)
);

CREATE INDEX IF NOT EXISTS idx_tags_context_active ON tags(context, is_active);

-- ============================================================================
-- TABLE: spaces
-- ============================================================================
-- Labs (space_type 1) and classrooms (space_type 2) share one table

CREATE TABLE IF NOT EXISTS spaces (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    space_type INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spaces_type ON spaces(space_type);

-- ============================================================================
-- Association tables
-- ============================================================================

CREATE TABLE IF NOT EXISTS post_tag (
    post_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (post_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_post_tag_tag ON post_tag(tag_id);

CREATE TABLE IF NOT EXISTS space_tag (
    space_id INTEGER NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (space_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_space_tag_tag ON space_tag(tag_id);

CREATE TABLE IF NOT EXISTS project_tag (
    project_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (project_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_project_tag_tag ON project_tag(tag_id);

-- ============================================================================
-- TABLE: audit_entries
-- ============================================================================
-- Append-only activity log

CREATE TABLE IF NOT EXISTS audit_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id INTEGER,
    action TEXT NOT NULL,
    subject_type TEXT NOT NULL,
    subject_id INTEGER NOT NULL,
    description TEXT,
    properties TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_subject ON audit_entries(subject_type, subject_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        apply_migrations(&conn).unwrap();
        apply_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_unique_name_key_per_context() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();

        let insert = "INSERT INTO tags (context, name, name_key, slug, created_at, updated_at)
                      VALUES (?1, ?2, ?3, ?4, '', '')";
        conn.execute(insert, ["posts", "AI", "ai", "ai"]).unwrap();
        conn.execute(insert, ["labs", "AI", "ai", "ai"]).unwrap();

        assert!(conn.execute(insert, ["posts", "ai", "ai", "ai-1"]).is_err());
        assert!(conn.execute(insert, ["posts", "A.I.", "a.i.", "ai"]).is_err());
    }

    #[test]
    fn test_deleting_tag_cascades_links() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        apply_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO tags (id, context, name, name_key, slug, created_at, updated_at)
             VALUES (1, 'posts', 'AI', 'ai', 'ai', '', '')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO post_tag (post_id, tag_id, created_at) VALUES (10, 1, '')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM tags WHERE id = 1", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_tag", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
