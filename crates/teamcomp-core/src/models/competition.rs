//! Competition model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::attempt::AttemptId;

uuid_id!(
    /// A unique identifier for a competition
    CompetitionId
);

/// Reward points handed out by rank, per scoring category
pub const DEFAULT_REWARDS: [i64; 5] = [10, 7, 5, 3, 1];

/// Competition lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompetitionStatus {
    Draft,
    Started,
    Finished,
    Failed,
}

impl CompetitionStatus {
    /// Database representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompetitionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "STARTED" => Ok(Self::Started),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            other => Err(Error::InvalidInput(format!(
                "unknown competition status '{other}'"
            ))),
        }
    }
}

/// Ordered reward points by rank, one list per scoring category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub grind: Vec<i64>,
    pub point: Vec<i64>,
    pub speed: Vec<i64>,
    pub accuracy: Vec<i64>,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            grind: DEFAULT_REWARDS.to_vec(),
            point: DEFAULT_REWARDS.to_vec(),
            speed: DEFAULT_REWARDS.to_vec(),
            accuracy: DEFAULT_REWARDS.to_vec(),
        }
    }
}

/// Look up the reward for a 1-based rank, 0 past the end of the schedule.
pub fn reward_for_rank(schedule: &[i64], rank: usize) -> i64 {
    rank.checked_sub(1)
        .and_then(|index| schedule.get(index))
        .copied()
        .unwrap_or(0)
}

/// A time-boxed scoring window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    /// Unique identifier
    pub id: CompetitionId,
    /// Reward multiplier
    pub multiplier: i64,
    /// Reward schedule
    pub rewards: RewardSchedule,
    /// Window start, inclusive (Unix ms)
    pub from_at: i64,
    /// Window end, exclusive (Unix ms)
    pub to_at: i64,
    /// Lifecycle status
    pub status: CompetitionStatus,
    /// Attempt that produced the final result
    pub result_attempt_id: Option<AttemptId>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Competition {
    /// Create a draft competition over `[from_at, to_at)`
    #[must_use]
    pub fn draft(from_at: i64, to_at: i64, multiplier: i64, rewards: RewardSchedule) -> Self {
        let now = crate::util::unix_millis_now();
        Self {
            id: CompetitionId::new(),
            multiplier,
            rewards,
            from_at,
            to_at,
            status: CompetitionStatus::Draft,
            result_attempt_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `at` (Unix ms) falls inside `[from_at, to_at)`
    pub const fn contains(&self, at: i64) -> bool {
        self.from_at <= at && at < self.to_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_for_rank() {
        assert_eq!(reward_for_rank(&DEFAULT_REWARDS, 1), 10);
        assert_eq!(reward_for_rank(&DEFAULT_REWARDS, 5), 1);
        assert_eq!(reward_for_rank(&DEFAULT_REWARDS, 6), 0);
        assert_eq!(reward_for_rank(&DEFAULT_REWARDS, 0), 0);
    }

    #[test]
    fn test_window_is_half_open() {
        let competition = Competition::draft(1_000, 2_000, 1, RewardSchedule::default());
        assert!(competition.contains(1_000));
        assert!(competition.contains(1_999));
        assert!(!competition.contains(2_000));
        assert_eq!(competition.status, CompetitionStatus::Draft);
    }
}
