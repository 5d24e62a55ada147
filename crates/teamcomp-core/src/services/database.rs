//! Shared database service wrapper used by the job and the read paths.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::Connection;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{
    AttemptRepository, CompetitionRepository, Database, LibSqlAttemptRepository,
    LibSqlCompetitionRepository, LibSqlMemberRepository, LibSqlSnapshotRepository,
    MemberRepository, SnapshotRepository,
};
use crate::error::{Error, Result};
use crate::leaderboard::{self, Leaderboard, MemberTotal};
use crate::models::{
    AttemptId, Classification, Competition, CompetitionId, CompetitionStatus, Member, MemberRecord,
    Snapshot, SnapshotId, SyncAttempt,
};
use crate::sync::delta::{self, DeltaPlan, DeltaSummary};
use crate::util::{floor_to_minute, unix_millis_now};

/// Competition transitions made by one advancement pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Advancement {
    pub closed: u64,
    pub started: u64,
}

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening database at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Most recent attempt that has not been discarded.
    pub async fn latest_attempt(&self) -> Result<Option<SyncAttempt>> {
        let db = self.db.lock().await;
        let repo = LibSqlAttemptRepository::new(db.connection());
        repo.latest().await
    }

    /// Fetch an attempt by id.
    pub async fn get_attempt(&self, id: &AttemptId) -> Result<Option<SyncAttempt>> {
        let db = self.db.lock().await;
        let repo = LibSqlAttemptRepository::new(db.connection());
        repo.get(id).await
    }

    /// List attempts newest-first.
    pub async fn list_attempts(&self, limit: usize) -> Result<Vec<SyncAttempt>> {
        let db = self.db.lock().await;
        let repo = LibSqlAttemptRepository::new(db.connection());
        repo.list(limit).await
    }

    /// Soft-delete an attempt.
    pub async fn discard_attempt(&self, id: &AttemptId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlAttemptRepository::new(db.connection());
        repo.discard(id, unix_millis_now()).await
    }

    /// Append an attempt that carries no new snapshot.
    pub async fn record_attempt(&self, attempt: &SyncAttempt) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlAttemptRepository::new(db.connection());
        repo.insert(attempt).await
    }

    /// Fetch a snapshot by id.
    pub async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<Snapshot>> {
        let db = self.db.lock().await;
        let repo = LibSqlSnapshotRepository::new(db.connection());
        repo.get(id).await
    }

    /// Store a fetched document and append the attempt that observed it.
    ///
    /// Both writes commit together. The attempt is `CACHE` when the document
    /// resolves to the previous attempt's snapshot, `NEW` otherwise.
    pub async fn persist_observation(
        &self,
        previous: Option<&SyncAttempt>,
        payload: &str,
        created_at: i64,
    ) -> Result<SyncAttempt> {
        let db = self.db.lock().await;
        let tx = db.connection().transaction().await?;
        match Self::persist_in(&tx, previous, payload, created_at).await {
            Ok(attempt) => {
                tx.commit().await?;
                Ok(attempt)
            }
            Err(error) => {
                tx.rollback().await.ok();
                Err(error)
            }
        }
    }

    async fn persist_in(
        conn: &Connection,
        previous: Option<&SyncAttempt>,
        payload: &str,
        created_at: i64,
    ) -> Result<SyncAttempt> {
        let snapshot_id = LibSqlSnapshotRepository::new(conn)
            .store(payload, created_at)
            .await?;

        let classification = if previous.and_then(|attempt| attempt.snapshot_id) == Some(snapshot_id)
        {
            Classification::Cache
        } else {
            Classification::New
        };

        let attempt = SyncAttempt::next(
            previous,
            Some(snapshot_id),
            classification,
            classification.description(),
            created_at,
        );
        LibSqlAttemptRepository::new(conn).insert(&attempt).await?;
        Ok(attempt)
    }

    /// Apply a member delta plan atomically.
    pub async fn apply_delta(&self, plan: &DeltaPlan, now: i64) -> Result<DeltaSummary> {
        let db = self.db.lock().await;
        let tx = db.connection().transaction().await?;
        match delta::apply(&tx, plan, now).await {
            Ok(summary) => {
                tx.commit().await?;
                Ok(summary)
            }
            Err(error) => {
                tx.rollback().await.ok();
                Err(error)
            }
        }
    }

    /// Close the expiring competition and open the next due one.
    ///
    /// Both updates are scoped to the rows' current status, so repeating a
    /// pass is a no-op.
    pub async fn advance_competitions(
        &self,
        at: DateTime<Utc>,
        closing_status: CompetitionStatus,
        result_attempt_id: Option<&AttemptId>,
    ) -> Result<Advancement> {
        let db = self.db.lock().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());
        let now = unix_millis_now();

        let closed = repo
            .close_expired(
                floor_to_minute(at).timestamp_millis(),
                closing_status,
                result_attempt_id,
                now,
            )
            .await?;
        let started = repo.start_due(at.timestamp_millis(), now).await?;

        Ok(Advancement { closed, started })
    }

    /// Insert planned competitions, refusing when any competition exists.
    pub async fn seed_competitions(&self, competitions: &[Competition]) -> Result<usize> {
        let db = self.db.lock().await;
        let tx = db.connection().transaction().await?;
        match Self::seed_in(&tx, competitions).await {
            Ok(count) => {
                tx.commit().await?;
                Ok(count)
            }
            Err(error) => {
                tx.rollback().await.ok();
                Err(error)
            }
        }
    }

    async fn seed_in(conn: &Connection, competitions: &[Competition]) -> Result<usize> {
        let repo = LibSqlCompetitionRepository::new(conn);
        if repo.count().await? > 0 {
            return Err(Error::AlreadySeeded);
        }
        for competition in competitions {
            repo.insert(competition).await?;
        }
        Ok(competitions.len())
    }

    /// List competitions by window start.
    pub async fn list_competitions(&self) -> Result<Vec<Competition>> {
        let db = self.db.lock().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());
        repo.list().await
    }

    /// Fetch a competition by id.
    pub async fn get_competition(&self, id: &CompetitionId) -> Result<Option<Competition>> {
        let db = self.db.lock().await;
        let repo = LibSqlCompetitionRepository::new(db.connection());
        repo.get(id).await
    }

    /// List members by username.
    pub async fn list_members(&self) -> Result<Vec<Member>> {
        let db = self.db.lock().await;
        let repo = LibSqlMemberRepository::new(db.connection());
        repo.list().await
    }

    /// Member records written by one attempt.
    pub async fn records_for_attempt(&self, id: &AttemptId) -> Result<Vec<MemberRecord>> {
        let db = self.db.lock().await;
        let repo = LibSqlMemberRepository::new(db.connection());
        repo.records_for_attempt(id).await
    }

    /// Score one competition.
    pub async fn leaderboard(&self, id: &CompetitionId) -> Result<Leaderboard> {
        let db = self.db.lock().await;
        let competition = LibSqlCompetitionRepository::new(db.connection())
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("competition {id}")))?;
        Self::score(db.connection(), &competition).await
    }

    /// Rewards per member summed over every finished competition.
    pub async fn totals(&self) -> Result<Vec<MemberTotal>> {
        let db = self.db.lock().await;
        let finished = LibSqlCompetitionRepository::new(db.connection())
            .list_by_status(CompetitionStatus::Finished)
            .await?;

        let mut boards = Vec::with_capacity(finished.len());
        for competition in &finished {
            boards.push(Self::score(db.connection(), competition).await?);
        }
        Ok(leaderboard::totals(&boards))
    }

    async fn score(conn: &Connection, competition: &Competition) -> Result<Leaderboard> {
        let repo = LibSqlMemberRepository::new(conn);
        let members = repo.list().await?;
        let records = repo
            .records_starting_between(competition.from_at, competition.to_at)
            .await?;
        Ok(Leaderboard::compute(competition, &members, &records))
    }
}
