//! Sync attempt (request log) repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{AttemptId, SyncAttempt};
use libsql::Connection;

use super::{nullable_text, parse_column, parse_optional_column};

const ATTEMPT_COLUMNS: &str =
    "id, prev_id, snapshot_id, classification, description, created_at, deleted_at";

/// Trait for request log operations (async)
#[allow(async_fn_in_trait)]
pub trait AttemptRepository {
    /// Append an attempt to the log
    async fn insert(&self, attempt: &SyncAttempt) -> Result<()>;

    /// Get an attempt by ID, discarded or not
    async fn get(&self, id: &AttemptId) -> Result<Option<SyncAttempt>>;

    /// Most recent attempt that has not been discarded
    async fn latest(&self) -> Result<Option<SyncAttempt>>;

    /// List attempts, newest first
    async fn list(&self, limit: usize) -> Result<Vec<SyncAttempt>>;

    /// Soft delete an attempt so it is no longer used as the resume point
    async fn discard(&self, id: &AttemptId, deleted_at: i64) -> Result<()>;
}

/// libSQL implementation of `AttemptRepository`
pub struct LibSqlAttemptRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAttemptRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_attempt(row: &libsql::Row) -> Result<SyncAttempt> {
        let id: String = row.get(0)?;
        let classification: String = row.get(3)?;
        Ok(SyncAttempt {
            id: parse_column(&id, "sync_attempts.id")?,
            prev_id: parse_optional_column(row.get(1)?, "sync_attempts.prev_id")?,
            snapshot_id: parse_optional_column(row.get(2)?, "sync_attempts.snapshot_id")?,
            classification: parse_column(&classification, "sync_attempts.classification")?,
            description: row.get(4)?,
            created_at: row.get(5)?,
            deleted_at: row.get(6)?,
        })
    }

    async fn collect(mut rows: libsql::Rows) -> Result<Vec<SyncAttempt>> {
        let mut attempts = Vec::new();
        while let Some(row) = rows.next().await? {
            attempts.push(Self::parse_attempt(&row)?);
        }
        Ok(attempts)
    }
}

impl AttemptRepository for LibSqlAttemptRepository<'_> {
    async fn insert(&self, attempt: &SyncAttempt) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_attempts
                    (id, prev_id, snapshot_id, classification, description, created_at, deleted_at)
                 VALUES (?, ?, ?, ?, ?, ?, NULL)",
                libsql::params![
                    attempt.id.as_str(),
                    nullable_text(attempt.prev_id.map(|id| id.as_str())),
                    nullable_text(attempt.snapshot_id.map(|id| id.as_str())),
                    attempt.classification.as_str(),
                    attempt.description.as_str(),
                    attempt.created_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &AttemptId) -> Result<Option<SyncAttempt>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {ATTEMPT_COLUMNS} FROM sync_attempts WHERE id = ?"),
                [id.as_str()],
            )
            .await?;
        Ok(Self::collect(rows).await?.into_iter().next())
    }

    async fn latest(&self) -> Result<Option<SyncAttempt>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ATTEMPT_COLUMNS} FROM sync_attempts
                     WHERE deleted_at IS NULL
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1"
                ),
                (),
            )
            .await?;
        Ok(Self::collect(rows).await?.into_iter().next())
    }

    async fn list(&self, limit: usize) -> Result<Vec<SyncAttempt>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ATTEMPT_COLUMNS} FROM sync_attempts
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?"
                ),
                [limit as i64],
            )
            .await?;
        Self::collect(rows).await
    }

    async fn discard(&self, id: &AttemptId, deleted_at: i64) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE sync_attempts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
                libsql::params![deleted_at, id.as_str()],
            )
            .await?;

        if updated == 0 && self.get(id).await?.is_none() {
            return Err(Error::NotFound(format!("sync attempt {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Classification;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlAttemptRepository::new(db.connection());

        let attempt = SyncAttempt::next(None, None, Classification::Error, "timeout", 10);
        repo.insert(&attempt).await.unwrap();

        let loaded = repo.get(&attempt.id).await.unwrap().unwrap();
        assert_eq!(loaded, attempt);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_latest_skips_discarded() {
        let db = setup().await;
        let repo = LibSqlAttemptRepository::new(db.connection());

        let first = SyncAttempt::next(None, None, Classification::Error, "first", 10);
        let second = SyncAttempt::next(Some(&first), None, Classification::Error, "second", 20);
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        assert_eq!(repo.latest().await.unwrap().unwrap().id, second.id);

        repo.discard(&second.id, 30).await.unwrap();
        assert_eq!(repo.latest().await.unwrap().unwrap().id, first.id);

        // Chain pointers survive the discard
        let discarded = repo.get(&second.id).await.unwrap().unwrap();
        assert_eq!(discarded.prev_id, Some(first.id));
        assert_eq!(discarded.deleted_at, Some(30));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_newest_first() {
        let db = setup().await;
        let repo = LibSqlAttemptRepository::new(db.connection());

        let first = SyncAttempt::next(None, None, Classification::Error, "first", 10);
        let second = SyncAttempt::next(Some(&first), None, Classification::Error, "second", 20);
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        let listed = repo.list(10).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|attempt| attempt.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(repo.list(1).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_discard_unknown_attempt() {
        let db = setup().await;
        let repo = LibSqlAttemptRepository::new(db.connection());

        let result = repo.discard(&AttemptId::new(), 1).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
