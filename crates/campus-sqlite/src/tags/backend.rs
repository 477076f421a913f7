//! [`TagBackend`] on SQLite

use super::associations::{AssociationTable, SqliteAssociations};
use super::store::{load_audit_entries, SqliteTagTransaction};
use crate::config::SqliteConfig;
use crate::connection::SqlitePool;
use crate::error::SqliteResult;
use async_trait::async_trait;
use campus_core::{
    AssociationStore, AuditEntry, ResourceId, TagBackend, TagContext, TagError, TagId,
    TagResult, TagTransaction,
};
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::debug;

/// SQLite implementation of [`TagBackend`]
///
/// Each unit of work runs on a blocking thread inside `BEGIN IMMEDIATE`, so
/// the write lock is taken before the first read and competing writers (also
/// from other processes) queue up behind it for the busy timeout.
#[derive(Clone)]
pub struct SqliteTagBackend {
    pool: SqlitePool,
}

impl SqliteTagBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database described by `config`
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::new(config)?))
    }

    /// Fresh in-memory database
    pub fn memory() -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::memory()?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register a lab, classroom or other space
    pub fn add_space(&self, id: i64, name: &str, space_type: i64) -> SqliteResult<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                "INSERT INTO spaces (id, name, space_type) VALUES (?1, ?2, ?3)",
                params![id, name, space_type],
            )?;
            Ok(())
        })
    }

    /// Link a resource outside any service operation
    pub fn attach(&self, context: &TagContext, resource_id: ResourceId, tag_id: TagId) -> TagResult<bool> {
        let table = association_table(context)?;
        self.pool
            .with_connection(|conn| Ok(SqliteAssociations::new(conn, table).attach(resource_id, tag_id)))
            .map_err(TagError::from)?
    }

    /// All `(resource, tag)` links of a context, ordered
    pub fn links(&self, context: &TagContext) -> SqliteResult<Vec<(ResourceId, TagId)>> {
        let Some(table) = AssociationTable::for_context(context) else {
            return Ok(Vec::new());
        };
        let sql = table.links_sql();

        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let links = stmt
                .query_map([], |row| {
                    Ok((ResourceId(row.get(0)?), TagId(row.get(1)?)))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(links)
        })
    }

    /// The audit log, oldest first
    pub fn audit_entries(&self) -> SqliteResult<Vec<AuditEntry>> {
        self.pool.with_connection(load_audit_entries)
    }
}

fn association_table(context: &TagContext) -> TagResult<AssociationTable> {
    AssociationTable::for_context(context).ok_or_else(|| {
        TagError::invalid_argument(format!("context '{}' has no association table", context))
    })
}

/// Run `work` in an IMMEDIATE transaction; commit on `Ok`, roll back on `Err`
fn run_immediate<T, F>(conn: &mut Connection, work: F) -> SqliteResult<TagResult<T>>
where
    F: FnOnce(&mut dyn TagTransaction) -> TagResult<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let outcome = work(&mut SqliteTagTransaction::new(&tx));

    match outcome {
        Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
        }
        Err(err) => {
            debug!(error = %err, "Rolling back tag transaction");
            tx.rollback()?;
            Ok(Err(err))
        }
    }
}

#[async_trait]
impl TagBackend for SqliteTagBackend {
    async fn transaction<T, F>(&self, work: F) -> TagResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TagTransaction) -> TagResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            pool.with_connection_mut(|conn| run_immediate(conn, work))
        })
        .await
        .map_err(|e| TagError::transaction(e.to_string()))?
        .map_err(TagError::from)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::TagDraft;

    #[tokio::test]
    async fn test_commit_on_ok() {
        let backend = SqliteTagBackend::memory().unwrap();

        let tag = backend
            .transaction(|tx| tx.tags().insert_tag(TagDraft::new(TagContext::POSTS, "News", "news")))
            .await
            .unwrap();

        let reloaded = backend
            .transaction(move |tx| tx.tags().tag(tag.id))
            .await
            .unwrap();
        assert_eq!(reloaded.map(|t| t.name), Some("News".to_string()));
    }

    #[tokio::test]
    async fn test_rollback_on_err() {
        let backend = SqliteTagBackend::memory().unwrap();

        let result: TagResult<()> = backend
            .transaction(|tx| {
                tx.tags()
                    .insert_tag(TagDraft::new(TagContext::POSTS, "News", "news"))?;
                Err(TagError::transaction("boom"))
            })
            .await;
        assert!(result.is_err());

        let found = backend
            .transaction(|tx| tx.tags().find_by_name(&TagContext::POSTS, "news"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_attach_requires_association_table() {
        let backend = SqliteTagBackend::memory().unwrap();
        let tag = backend
            .transaction(|tx| tx.tags().insert_tag(TagDraft::new(TagContext::POSTS, "A", "a")))
            .await
            .unwrap();

        assert!(backend.attach(&TagContext::POSTS, ResourceId(1), tag.id).unwrap());
        assert_eq!(
            backend.links(&TagContext::POSTS).unwrap(),
            vec![(ResourceId(1), tag.id)]
        );
        assert!(matches!(
            backend.attach(&TagContext::ATTACHMENTS, ResourceId(1), tag.id),
            Err(TagError::InvalidArgument(_))
        ));
        assert!(backend.links(&TagContext::ATTACHMENTS).unwrap().is_empty());
    }
}
