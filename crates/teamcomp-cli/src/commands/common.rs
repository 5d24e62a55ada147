use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use teamcomp_core::leaderboard::{Leaderboard, MemberTotal};
use teamcomp_core::models::{Competition, SyncAttempt};
use teamcomp_core::nitrotype::HttpTeamFetcher;
use teamcomp_core::{AppConfig, DatabaseService, RunOutcome, RunReport, SyncJob};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct AttemptListItem {
    pub id: String,
    pub prev_id: Option<String>,
    pub snapshot_id: Option<String>,
    pub classification: String,
    pub description: String,
    pub created_at: i64,
    pub created_at_iso: String,
}

#[derive(Debug, Serialize)]
pub struct CompetitionListItem {
    pub id: String,
    pub status: String,
    pub multiplier: i64,
    pub from_at: i64,
    pub to_at: i64,
    pub from_at_iso: String,
    pub to_at_iso: String,
    pub result_attempt_id: Option<String>,
}

pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &AppConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| config.db_path.clone()) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("teamcomp").join("teamcomp.db"))
        .ok_or(CliError::NoDataDir)
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path.to_path_buf()).await?)
}

pub async fn build_job(config: &AppConfig, db_path: &Path) -> Result<SyncJob, CliError> {
    let db = open_database(db_path).await?;
    let fetcher = HttpTeamFetcher::new(config)?;
    Ok(SyncJob::new(db, Arc::new(fetcher), config))
}

/// Parse an RFC 3339 timestamp given on the command line
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|date_time| date_time.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidTimestamp(value.to_string()))
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn attempt_to_list_item(attempt: &SyncAttempt) -> AttemptListItem {
    AttemptListItem {
        id: attempt.id.to_string(),
        prev_id: attempt.prev_id.map(|id| id.to_string()),
        snapshot_id: attempt.snapshot_id.map(|id| id.to_string()),
        classification: attempt.classification.to_string(),
        description: attempt.description.clone(),
        created_at: attempt.created_at,
        created_at_iso: format_timestamp(attempt.created_at),
    }
}

pub fn competition_to_list_item(competition: &Competition) -> CompetitionListItem {
    CompetitionListItem {
        id: competition.id.to_string(),
        status: competition.status.to_string(),
        multiplier: competition.multiplier,
        from_at: competition.from_at,
        to_at: competition.to_at,
        from_at_iso: format_timestamp(competition.from_at),
        to_at_iso: format_timestamp(competition.to_at),
        result_attempt_id: competition.result_attempt_id.map(|id| id.to_string()),
    }
}

pub fn format_attempt_lines(attempts: &[SyncAttempt]) -> Vec<String> {
    attempts
        .iter()
        .map(|attempt| {
            format!(
                "{:<13}  {}  {:<5}  {}",
                short_id(&attempt.id.to_string()),
                format_timestamp(attempt.created_at),
                attempt.classification.as_str(),
                attempt.description
            )
        })
        .collect()
}

pub fn format_competition_lines(competitions: &[Competition]) -> Vec<String> {
    competitions
        .iter()
        .map(|competition| {
            format!(
                "{}  {} .. {}  {:<8}  x{}",
                competition.id,
                format_timestamp(competition.from_at),
                format_timestamp(competition.to_at),
                competition.status.as_str(),
                competition.multiplier
            )
        })
        .collect()
}

pub fn format_leaderboard_lines(leaderboard: &Leaderboard) -> Vec<String> {
    let competition = &leaderboard.competition;
    let mut lines = vec![format!(
        "{} .. {}  {}  x{}",
        format_timestamp(competition.from_at),
        format_timestamp(competition.to_at),
        competition.status,
        competition.multiplier
    )];

    if leaderboard.entries.is_empty() {
        lines.push("No races recorded.".to_string());
        return lines;
    }

    for entry in &leaderboard.entries {
        lines.push(format!(
            "{:<20}  races={:<3} (#{})  wpm={:<6.1} (#{})  acc={:<5.1} (#{})  points={:<8.1} (#{})  reward={}",
            entry.display_name,
            entry.grind.value,
            entry.grind.rank,
            entry.speed.value,
            entry.speed.rank,
            entry.accuracy.value,
            entry.accuracy.rank,
            entry.points.value,
            entry.points.rank,
            entry.total_reward()
        ));
    }
    lines
}

pub fn format_total_lines(totals: &[MemberTotal]) -> Vec<String> {
    totals
        .iter()
        .enumerate()
        .map(|(index, total)| {
            format!(
                "{:>3}. {:<20}  reward={:<6}  competitions={}",
                index + 1,
                total.display_name,
                total.reward,
                total.competitions
            )
        })
        .collect()
}

pub fn format_run_report(report: &RunReport) -> String {
    let outcome = match &report.outcome {
        RunOutcome::Succeeded { attempt, delta } => delta.as_ref().map_or_else(
            || format!("{} {}", attempt.classification, attempt.description),
            |delta| {
                format!(
                    "{} {} (members={}, records={}, promoted={}, disqualified={})",
                    attempt.classification,
                    attempt.description,
                    delta.members,
                    delta.records,
                    delta.promoted,
                    delta.disqualified
                )
            },
        ),
        RunOutcome::Failed { reason, .. } => format!("FAILED {reason}"),
        RunOutcome::Aborted { reason } => format!("ABORTED {reason}"),
    };

    match report.advancement {
        Some(advancement) => format!(
            "{outcome}; competitions closed={}, started={}",
            advancement.closed, advancement.started
        ),
        None => outcome,
    }
}
