//! Per-context association tables

use super::lift;
use crate::schema::{SPACE_TYPE_CLASSROOM, SPACE_TYPE_LAB};
use campus_core::{AssociationStore, ResourceId, TagContext, TagId, TagResult};
use chrono::Utc;
use rusqlite::{params, Connection};

/// Join table holding the resource links of one context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationTable {
    pub context: &'static str,
    pub table: &'static str,
    pub resource_column: &'static str,
    /// Only links to spaces of this `space_type` belong to the context
    pub space_type: Option<i64>,
}

impl AssociationTable {
    pub const POSTS: Self = Self {
        context: "posts",
        table: "post_tag",
        resource_column: "post_id",
        space_type: None,
    };
    pub const LABS: Self = Self {
        context: "labs",
        table: "space_tag",
        resource_column: "space_id",
        space_type: Some(SPACE_TYPE_LAB),
    };
    pub const CLASSROOMS: Self = Self {
        context: "classrooms",
        table: "space_tag",
        resource_column: "space_id",
        space_type: Some(SPACE_TYPE_CLASSROOM),
    };
    pub const SPACES: Self = Self {
        context: "spaces",
        table: "space_tag",
        resource_column: "space_id",
        space_type: None,
    };
    pub const PROJECTS: Self = Self {
        context: "projects",
        table: "project_tag",
        resource_column: "project_id",
        space_type: None,
    };

    pub const ALL: [Self; 5] = [
        Self::POSTS,
        Self::LABS,
        Self::CLASSROOMS,
        Self::SPACES,
        Self::PROJECTS,
    ];

    /// `None` for contexts whose resources carry no tags
    pub fn for_context(context: &TagContext) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|table| table.context == context.as_str())
    }

    /// Join restricting rows aliased `a` to spaces of this context's type
    fn space_join(&self) -> String {
        match self.space_type {
            Some(space_type) => format!(
                " JOIN spaces s ON s.id = a.{} AND s.space_type = {}",
                self.resource_column, space_type
            ),
            None => String::new(),
        }
    }

    /// Correlated subquery counting links of the tag aliased `t`
    pub(crate) fn usage_sql(&self) -> String {
        format!(
            "(SELECT COUNT(*) FROM {} a{} WHERE a.tag_id = t.id)",
            self.table,
            self.space_join()
        )
    }

    /// Every `(resource, tag)` pair of the context
    pub(crate) fn links_sql(&self) -> String {
        format!(
            "SELECT a.{col}, a.tag_id FROM {table} a{join} ORDER BY a.{col}, a.tag_id",
            col = self.resource_column,
            table = self.table,
            join = self.space_join(),
        )
    }

    fn resources_sql(&self) -> String {
        format!(
            "SELECT a.{col} FROM {table} a{join} WHERE a.tag_id = ?1 ORDER BY a.{col}",
            col = self.resource_column,
            table = self.table,
            join = self.space_join(),
        )
    }
}

/// [`AssociationStore`] over one [`AssociationTable`]
pub struct SqliteAssociations<'a> {
    conn: &'a Connection,
    table: AssociationTable,
}

impl<'a> SqliteAssociations<'a> {
    pub fn new(conn: &'a Connection, table: AssociationTable) -> Self {
        Self { conn, table }
    }
}

impl AssociationStore for SqliteAssociations<'_> {
    fn resources_for_tag(&self, tag_id: TagId) -> TagResult<Vec<ResourceId>> {
        lift(query_ids(self.conn, &self.table.resources_sql(), tag_id))
    }

    fn attach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool> {
        let sql = format!(
            "INSERT INTO {table} ({col}, tag_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT({col}, tag_id) DO NOTHING",
            col = self.table.resource_column,
            table = self.table.table,
        );

        let inserted = lift(self.conn.execute(
            &sql,
            params![resource_id.0, tag_id.0, Utc::now().to_rfc3339()],
        ))?;
        Ok(inserted > 0)
    }

    fn detach(&mut self, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool> {
        let sql = format!(
            "DELETE FROM {table} WHERE {col} = ?1 AND tag_id = ?2",
            col = self.table.resource_column,
            table = self.table.table,
        );

        let removed = lift(self.conn.execute(&sql, params![resource_id.0, tag_id.0]))?;
        Ok(removed > 0)
    }

    fn detach_tag(&mut self, tag_id: TagId) -> TagResult<usize> {
        let sql = format!("DELETE FROM {} WHERE tag_id = ?1", self.table.table);
        lift(self.conn.execute(&sql, [tag_id.0]))
    }
}

fn query_ids(conn: &Connection, sql: &str, tag_id: TagId) -> rusqlite::Result<Vec<ResourceId>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([tag_id.0], |row| row.get::<_, i64>(0))?
        .map(|id| id.map(ResourceId))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::apply_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO tags (id, context, name, name_key, slug, created_at, updated_at)
                VALUES (1, 'labs', 'Vision', 'vision', 'vision', '', ''),
                       (2, 'labs', 'CV', 'cv', 'cv', '', '');
             INSERT INTO spaces (id, name, space_type)
                VALUES (10, 'Vision Lab', 1), (20, 'Room 101', 2);
             INSERT INTO space_tag (space_id, tag_id, created_at)
                VALUES (10, 1, ''), (20, 1, '');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_for_context() {
        assert_eq!(
            AssociationTable::for_context(&TagContext::POSTS),
            Some(AssociationTable::POSTS)
        );
        assert_eq!(
            AssociationTable::for_context(&TagContext::CLASSROOMS).map(|t| t.table),
            Some("space_tag")
        );
        assert_eq!(AssociationTable::for_context(&TagContext::ATTACHMENTS), None);
        assert_eq!(AssociationTable::for_context(&TagContext::PROGRAMS), None);
    }

    #[test]
    fn test_space_type_filter() {
        let conn = setup();

        let labs = SqliteAssociations::new(&conn, AssociationTable::LABS);
        assert_eq!(labs.resources_for_tag(TagId(1)).unwrap(), vec![ResourceId(10)]);

        let spaces = SqliteAssociations::new(&conn, AssociationTable::SPACES);
        assert_eq!(
            spaces.resources_for_tag(TagId(1)).unwrap(),
            vec![ResourceId(10), ResourceId(20)]
        );
    }

    #[test]
    fn test_attach_is_idempotent() {
        let conn = setup();
        let mut labs = SqliteAssociations::new(&conn, AssociationTable::LABS);

        assert!(labs.attach(ResourceId(10), TagId(2)).unwrap());
        assert!(!labs.attach(ResourceId(10), TagId(2)).unwrap());
        assert!(labs.detach(ResourceId(10), TagId(2)).unwrap());
        assert!(!labs.detach(ResourceId(10), TagId(2)).unwrap());
    }

    #[test]
    fn test_detach_tag_ignores_space_type() {
        let conn = setup();
        let mut labs = SqliteAssociations::new(&conn, AssociationTable::LABS);

        assert_eq!(labs.detach_tag(TagId(1)).unwrap(), 2);

        let spaces = SqliteAssociations::new(&conn, AssociationTable::SPACES);
        assert!(spaces.resources_for_tag(TagId(1)).unwrap().is_empty());
    }
}
