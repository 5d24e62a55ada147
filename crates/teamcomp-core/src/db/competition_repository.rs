//! Competition repository

use crate::error::Result;
use crate::models::{AttemptId, Competition, CompetitionId, CompetitionStatus, RewardSchedule};
use libsql::Connection;

use super::{nullable_text, parse_column, parse_optional_column};

const COMPETITION_COLUMNS: &str = "id, multiplier, grind_rewards, point_rewards, speed_rewards, \
     accuracy_rewards, from_at, to_at, status, result_attempt_id, created_at, updated_at";

/// Trait for competition storage operations (async)
#[allow(async_fn_in_trait)]
pub trait CompetitionRepository {
    /// Insert a competition
    async fn insert(&self, competition: &Competition) -> Result<()>;

    /// Get a competition by ID
    async fn get(&self, id: &CompetitionId) -> Result<Option<Competition>>;

    /// List competitions ordered by window start
    async fn list(&self) -> Result<Vec<Competition>>;

    /// List competitions with the given status ordered by window start
    async fn list_by_status(&self, status: CompetitionStatus) -> Result<Vec<Competition>>;

    /// Number of stored competitions
    async fn count(&self) -> Result<i64>;

    /// Close `STARTED` competitions whose window ended at or before `cutoff`
    async fn close_expired(
        &self,
        cutoff: i64,
        status: CompetitionStatus,
        result_attempt_id: Option<&AttemptId>,
        now: i64,
    ) -> Result<u64>;

    /// Start the `DRAFT` competition whose window contains `at`
    ///
    /// No-op while another competition is `STARTED`.
    async fn start_due(&self, at: i64, now: i64) -> Result<u64>;
}

/// libSQL implementation of `CompetitionRepository`
pub struct LibSqlCompetitionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCompetitionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_competition(row: &libsql::Row) -> Result<Competition> {
        let id: String = row.get(0)?;
        let grind: String = row.get(2)?;
        let point: String = row.get(3)?;
        let speed: String = row.get(4)?;
        let accuracy: String = row.get(5)?;
        let status: String = row.get(8)?;
        Ok(Competition {
            id: parse_column(&id, "competitions.id")?,
            multiplier: row.get(1)?,
            rewards: RewardSchedule {
                grind: serde_json::from_str(&grind)?,
                point: serde_json::from_str(&point)?,
                speed: serde_json::from_str(&speed)?,
                accuracy: serde_json::from_str(&accuracy)?,
            },
            from_at: row.get(6)?,
            to_at: row.get(7)?,
            status: parse_column(&status, "competitions.status")?,
            result_attempt_id: parse_optional_column(
                row.get(9)?,
                "competitions.result_attempt_id",
            )?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    async fn collect(mut rows: libsql::Rows) -> Result<Vec<Competition>> {
        let mut competitions = Vec::new();
        while let Some(row) = rows.next().await? {
            competitions.push(Self::parse_competition(&row)?);
        }
        Ok(competitions)
    }
}

impl CompetitionRepository for LibSqlCompetitionRepository<'_> {
    async fn insert(&self, competition: &Competition) -> Result<()> {
        let rewards = &competition.rewards;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO competitions ({COMPETITION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                libsql::params![
                    competition.id.as_str(),
                    competition.multiplier,
                    serde_json::to_string(&rewards.grind)?,
                    serde_json::to_string(&rewards.point)?,
                    serde_json::to_string(&rewards.speed)?,
                    serde_json::to_string(&rewards.accuracy)?,
                    competition.from_at,
                    competition.to_at,
                    competition.status.as_str(),
                    nullable_text(competition.result_attempt_id.map(|id| id.as_str())),
                    competition.created_at,
                    competition.updated_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &CompetitionId) -> Result<Option<Competition>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {COMPETITION_COLUMNS} FROM competitions WHERE id = ?"),
                [id.as_str()],
            )
            .await?;
        Ok(Self::collect(rows).await?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Competition>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {COMPETITION_COLUMNS} FROM competitions ORDER BY from_at"),
                (),
            )
            .await?;
        Self::collect(rows).await
    }

    async fn list_by_status(&self, status: CompetitionStatus) -> Result<Vec<Competition>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COMPETITION_COLUMNS} FROM competitions WHERE status = ? ORDER BY from_at"
                ),
                [status.as_str()],
            )
            .await?;
        Self::collect(rows).await
    }

    async fn count(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM competitions", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn close_expired(
        &self,
        cutoff: i64,
        status: CompetitionStatus,
        result_attempt_id: Option<&AttemptId>,
        now: i64,
    ) -> Result<u64> {
        let updated = self
            .conn
            .execute(
                "UPDATE competitions SET status = ?, result_attempt_id = ?, updated_at = ?
                 WHERE status = 'STARTED' AND to_at <= ?",
                libsql::params![
                    status.as_str(),
                    nullable_text(result_attempt_id.map(AttemptId::as_str)),
                    now,
                    cutoff
                ],
            )
            .await?;
        Ok(updated)
    }

    async fn start_due(&self, at: i64, now: i64) -> Result<u64> {
        let updated = self
            .conn
            .execute(
                "UPDATE competitions SET status = 'STARTED', updated_at = ?
                 WHERE id = (
                     SELECT id FROM competitions
                     WHERE status = 'DRAFT' AND from_at <= ? AND to_at > ?
                     ORDER BY from_at
                     LIMIT 1
                 )
                 AND NOT EXISTS (SELECT 1 FROM competitions WHERE status = 'STARTED')",
                libsql::params![now, at, at],
            )
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());

        let competition = Competition::draft(0, 600_000, 4, RewardSchedule::default());
        repo.insert(&competition).await.unwrap();

        let loaded = repo.get(&competition.id).await.unwrap().unwrap();
        assert_eq!(loaded, competition);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_due_respects_window_and_single_started() {
        let db = setup().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());

        let first = Competition::draft(0, 600, 1, RewardSchedule::default());
        let second = Competition::draft(600, 1200, 1, RewardSchedule::default());
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        assert_eq!(repo.start_due(-1, 1).await.unwrap(), 0);
        assert_eq!(repo.start_due(0, 1).await.unwrap(), 1);
        assert_eq!(repo.start_due(0, 2).await.unwrap(), 0);
        // Second window is due but the first is still running
        assert_eq!(repo.start_due(700, 3).await.unwrap(), 0);

        let started = repo.list_by_status(CompetitionStatus::Started).await.unwrap();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].id, first.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_expired_only_touches_elapsed_started() {
        let db = setup().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());

        let competition = Competition::draft(0, 600, 1, RewardSchedule::default());
        repo.insert(&competition).await.unwrap();
        repo.start_due(0, 1).await.unwrap();

        assert_eq!(
            repo.close_expired(599, CompetitionStatus::Finished, None, 2)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            repo.close_expired(600, CompetitionStatus::Failed, None, 3)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            repo.close_expired(600, CompetitionStatus::Finished, None, 4)
                .await
                .unwrap(),
            0
        );

        let closed = repo.get(&competition.id).await.unwrap().unwrap();
        assert_eq!(closed.status, CompetitionStatus::Failed);
        assert_eq!(closed.updated_at, 3);
    }
}
