//! Sync attempt model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::snapshot::SnapshotId;

uuid_id!(
    /// A unique identifier for a sync attempt
    AttemptId
);

/// Outcome tag attached to each sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// A document not seen in the previous attempt
    New,
    /// Same document as the previous attempt
    Cache,
    /// Fetch or validation failed
    Error,
}

impl Classification {
    /// Database representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Cache => "CACHE",
            Self::Error => "ERROR",
        }
    }

    /// Human description recorded alongside successful attempts
    pub const fn description(self) -> &'static str {
        match self {
            Self::New => "New log download",
            Self::Cache => "Same log found",
            Self::Error => "Unknown error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "CACHE" => Ok(Self::Cache),
            "ERROR" => Ok(Self::Error),
            other => Err(Error::InvalidInput(format!(
                "unknown classification '{other}'"
            ))),
        }
    }
}

/// One entry of the append-only request log
///
/// Attempts form a singly-linked chain through `prev_id`. The chain pointer
/// and snapshot reference are written once and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttempt {
    /// Unique identifier
    pub id: AttemptId,
    /// Previous attempt in the chain, `None` for the first attempt
    pub prev_id: Option<AttemptId>,
    /// Snapshot observed by this attempt
    pub snapshot_id: Option<SnapshotId>,
    /// Outcome classification
    pub classification: Classification,
    /// Free-text description
    pub description: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Soft delete timestamp (Unix ms)
    pub deleted_at: Option<i64>,
}

impl SyncAttempt {
    /// Build the next attempt in the chain after `prev`
    #[must_use]
    pub fn next(
        prev: Option<&Self>,
        snapshot_id: Option<SnapshotId>,
        classification: Classification,
        description: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            prev_id: prev.map(|attempt| attempt.id),
            snapshot_id,
            classification,
            description: description.into(),
            created_at,
            deleted_at: None,
        }
    }

    /// Whether this attempt has been discarded
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
