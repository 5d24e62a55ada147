//! The periodic team synchronization job.
//!
//! One run fetches the team document, stores it content-addressed, appends an
//! attempt to the request log, applies member deltas against the previous
//! observation and finally advances the competition state machine.

pub mod delta;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::{AttemptId, Classification, CompetitionStatus, SyncAttempt};
use crate::nitrotype::{FetchError, TeamFetcher, TeamResponse};
use crate::services::{Advancement, DatabaseService};

pub use delta::{DeltaPlan, DeltaSummary, MemberDelta};
pub use scheduler::{next_fire_after, Scheduler, FIRE_MINUTES};

/// Name attached to every log line of a run
pub const JOB_NAME: &str = "sync_teams";

/// What one run achieved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A document was stored and, unless it was a cache hit, deltas applied
    Succeeded {
        attempt: SyncAttempt,
        delta: Option<DeltaSummary>,
    },
    /// Fetch, persist or delta failed; `attempt` is whatever got recorded
    Failed {
        attempt: Option<SyncAttempt>,
        reason: String,
    },
    /// The document belongs to another team; nothing was written
    Aborted { reason: String },
}

impl RunOutcome {
    const fn closing_status(&self) -> CompetitionStatus {
        match self {
            Self::Succeeded { .. } => CompetitionStatus::Finished,
            Self::Failed { .. } | Self::Aborted { .. } => CompetitionStatus::Failed,
        }
    }

    const fn attempt(&self) -> Option<&SyncAttempt> {
        match self {
            Self::Succeeded { attempt, .. } => Some(attempt),
            Self::Failed { attempt, .. } => attempt.as_ref(),
            Self::Aborted { .. } => None,
        }
    }
}

/// Outcome of a run plus the competition transitions it caused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub advancement: Option<Advancement>,
}

/// Synchronization job bound to one team
#[derive(Clone)]
pub struct SyncJob {
    db: DatabaseService,
    fetcher: Arc<dyn TeamFetcher>,
    team_tag: String,
    team_id: i64,
    fetch_timeout: Duration,
}

impl SyncJob {
    pub fn new(db: DatabaseService, fetcher: Arc<dyn TeamFetcher>, config: &AppConfig) -> Self {
        Self {
            db,
            fetcher,
            team_tag: config.team_tag.clone(),
            team_id: config.team_id,
            fetch_timeout: config.fetch_timeout,
        }
    }

    pub fn team_tag(&self) -> &str {
        &self.team_tag
    }

    /// Run once at the current wall-clock time
    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Run once as if the clock read `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let span = tracing::info_span!("sync_job", job = JOB_NAME, team = %self.team_tag);
        async move {
            tracing::info!("Starting sync run");
            let outcome = self.execute(now).await;

            let advancement = if matches!(outcome, RunOutcome::Aborted { .. }) {
                None
            } else {
                let result_attempt_id = outcome.attempt().map(|attempt| attempt.id);
                self.advance(now, outcome.closing_status(), result_attempt_id.as_ref())
                    .await
            };

            match &outcome {
                RunOutcome::Succeeded { attempt, .. } => tracing::info!(
                    attempt_id = %attempt.id,
                    classification = %attempt.classification,
                    "Sync run succeeded"
                ),
                RunOutcome::Failed { reason, .. } => tracing::warn!(%reason, "Sync run failed"),
                RunOutcome::Aborted { reason } => tracing::error!(%reason, "Sync run aborted"),
            }

            RunReport {
                outcome,
                advancement,
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, now: DateTime<Utc>) -> RunOutcome {
        let created_at = now.timestamp_millis();

        let previous = match self.db.latest_attempt().await {
            Ok(previous) => previous,
            Err(error) => {
                return RunOutcome::Failed {
                    attempt: None,
                    reason: format!("failed to read the request log: {error}"),
                }
            }
        };

        let team = match self.fetch().await {
            Ok(team) => team,
            Err(error) => return self.record_fetch_failure(previous.as_ref(), &error, created_at).await,
        };

        if team.team_id() != Some(self.team_id) {
            return RunOutcome::Aborted {
                reason: format!(
                    "expected team id {} but the document carries {:?}",
                    self.team_id,
                    team.team_id()
                ),
            };
        }

        let attempt = match self.persist(previous.as_ref(), &team, created_at).await {
            Ok(attempt) => attempt,
            Err(error) => {
                return RunOutcome::Failed {
                    attempt: None,
                    reason: format!("failed to persist snapshot: {error}"),
                }
            }
        };

        if attempt.classification == Classification::Cache {
            tracing::debug!(attempt_id = %attempt.id, "Document unchanged, skipping deltas");
            return RunOutcome::Succeeded {
                attempt,
                delta: None,
            };
        }

        match self.apply_delta(previous.as_ref(), &attempt, &team, created_at).await {
            Ok(summary) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    members = summary.members,
                    records = summary.records,
                    promoted = summary.promoted,
                    disqualified = summary.disqualified,
                    "Applied member deltas"
                );
                RunOutcome::Succeeded {
                    attempt,
                    delta: Some(summary),
                }
            }
            Err(error) => RunOutcome::Failed {
                reason: format!("failed to apply member deltas: {error}"),
                attempt: Some(attempt),
            },
        }
    }

    /// Fetch and validate the team document
    async fn fetch(&self) -> std::result::Result<TeamResponse, FetchError> {
        let team = tokio::time::timeout(self.fetch_timeout, self.fetcher.get_team(&self.team_tag))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        if !team.success {
            return Err(FetchError::Rejected("response indicated failure".to_string()));
        }
        if team.data.info.is_none() {
            return Err(FetchError::Rejected("response has no team info".to_string()));
        }
        Ok(team)
    }

    /// Append an `ERROR` attempt when there is a chain to attach it to
    async fn record_fetch_failure(
        &self,
        previous: Option<&SyncAttempt>,
        error: &FetchError,
        created_at: i64,
    ) -> RunOutcome {
        let reason = error.to_string();
        let Some(previous) = previous else {
            return RunOutcome::Failed {
                attempt: None,
                reason,
            };
        };

        let attempt = SyncAttempt::next(
            Some(previous),
            previous.snapshot_id,
            Classification::Error,
            reason.clone(),
            created_at,
        );
        match self.db.record_attempt(&attempt).await {
            Ok(()) => RunOutcome::Failed {
                attempt: Some(attempt),
                reason,
            },
            Err(record_error) => {
                tracing::error!(error = %record_error, "Failed to record error attempt");
                RunOutcome::Failed {
                    attempt: None,
                    reason,
                }
            }
        }
    }

    async fn persist(
        &self,
        previous: Option<&SyncAttempt>,
        team: &TeamResponse,
        created_at: i64,
    ) -> Result<SyncAttempt> {
        let payload = team.to_canonical_json()?;
        self.db
            .persist_observation(previous, &payload, created_at)
            .await
    }

    async fn apply_delta(
        &self,
        previous: Option<&SyncAttempt>,
        attempt: &SyncAttempt,
        team: &TeamResponse,
        now: i64,
    ) -> Result<DeltaSummary> {
        let previous_team = match previous.and_then(|attempt| attempt.snapshot_id) {
            Some(snapshot_id) => {
                let snapshot = self.db.get_snapshot(&snapshot_id).await?.ok_or_else(|| {
                    Error::NotFound(format!("snapshot {snapshot_id}"))
                })?;
                TeamResponse::from_json(&snapshot.payload)?
            }
            None => TeamResponse::default(),
        };

        let plan = DeltaPlan::build(previous, attempt, &previous_team, team);
        self.db.apply_delta(&plan, now).await
    }

    /// Close the expiring competition as `FAILED` after a run that never
    /// produced an outcome, then start the next due one
    pub async fn fail_forward(&self, now: DateTime<Utc>) -> Option<Advancement> {
        self.advance(now, CompetitionStatus::Failed, None).await
    }

    async fn advance(
        &self,
        now: DateTime<Utc>,
        closing_status: CompetitionStatus,
        result_attempt_id: Option<&AttemptId>,
    ) -> Option<Advancement> {
        match self
            .db
            .advance_competitions(now, closing_status, result_attempt_id)
            .await
        {
            Ok(advancement) => {
                if advancement.closed > 0 || advancement.started > 0 {
                    tracing::info!(
                        closed = advancement.closed,
                        started = advancement.started,
                        status = %closing_status,
                        "Advanced competitions"
                    );
                }
                Some(advancement)
            }
            Err(error) => {
                tracing::error!(%error, "Failed to advance competitions");
                None
            }
        }
    }
}
