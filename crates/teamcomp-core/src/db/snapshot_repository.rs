//! Content-addressed snapshot storage

use crate::error::{Error, Result};
use crate::models::{Snapshot, SnapshotId};
use crate::util::hash_document;
use libsql::Connection;

use super::parse_column;

/// Trait for snapshot storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SnapshotRepository {
    /// Store a canonical document, returning the id of the row holding it
    ///
    /// Documents with the same hash resolve to the existing row.
    async fn store(&self, payload: &str, created_at: i64) -> Result<SnapshotId>;

    /// Get a snapshot by ID
    async fn get(&self, id: &SnapshotId) -> Result<Option<Snapshot>>;

    /// Find a snapshot by its content hash
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Snapshot>>;

    /// Number of stored snapshots
    async fn count(&self) -> Result<i64>;
}

/// libSQL implementation of `SnapshotRepository`
pub struct LibSqlSnapshotRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSnapshotRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_snapshot(row: &libsql::Row) -> Result<Snapshot> {
        let id: String = row.get(0)?;
        Ok(Snapshot {
            id: parse_column(&id, "snapshots.id")?,
            hash: row.get(1)?,
            payload: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    async fn query_one(&self, sql: &str, key: String) -> Result<Option<Snapshot>> {
        let mut rows = self.conn.query(sql, [key]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_snapshot(&row)?)),
            None => Ok(None),
        }
    }
}

impl SnapshotRepository for LibSqlSnapshotRepository<'_> {
    async fn store(&self, payload: &str, created_at: i64) -> Result<SnapshotId> {
        let hash = hash_document(payload.as_bytes());
        let id = SnapshotId::new();

        let inserted = self
            .conn
            .execute(
                "INSERT INTO snapshots (id, hash, payload, created_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(hash) DO NOTHING",
                libsql::params![id.as_str(), hash.as_str(), payload, created_at],
            )
            .await?;

        if inserted == 1 {
            tracing::debug!(snapshot_id = %id, %hash, "Stored new snapshot");
            return Ok(id);
        }

        let existing = self.find_by_hash(&hash).await?.ok_or_else(|| {
            Error::Database(format!("snapshot with hash {hash} vanished after conflict"))
        })?;
        tracing::debug!(snapshot_id = %existing.id, %hash, "Snapshot already stored");
        Ok(existing.id)
    }

    async fn get(&self, id: &SnapshotId) -> Result<Option<Snapshot>> {
        self.query_one(
            "SELECT id, hash, payload, created_at FROM snapshots WHERE id = ?",
            id.as_str(),
        )
        .await
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Snapshot>> {
        self.query_one(
            "SELECT id, hash, payload, created_at FROM snapshots WHERE hash = ?",
            hash.to_string(),
        )
        .await
    }

    async fn count(&self) -> Result<i64> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM snapshots", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_store_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlSnapshotRepository::new(db.connection());

        let first = repo.store(r#"{"success":true}"#, 1).await.unwrap();
        let second = repo.store(r#"{"success":true}"#, 2).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.count().await.unwrap(), 1);

        let snapshot = repo.get(&first).await.unwrap().unwrap();
        assert_eq!(snapshot.created_at, 1);
        assert_eq!(snapshot.hash, hash_document(br#"{"success":true}"#));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_distinct_documents_get_distinct_rows() {
        let db = setup().await;
        let repo = LibSqlSnapshotRepository::new(db.connection());

        let first = repo.store(r#"{"success":true}"#, 1).await.unwrap();
        let second = repo.store(r#"{"success":false}"#, 2).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.find_by_hash("missing").await.unwrap().is_none());
    }
}
