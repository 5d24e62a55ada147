//! Member and member record models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::attempt::AttemptId;

uuid_id!(
    /// A unique identifier for a team member
    MemberId
);

/// Lifecycle status of a member
///
/// Moves only `NEW -> ACTIVE` or `NEW | ACTIVE -> DISQUALIFIED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    /// Observed but no positive activity recorded yet
    New,
    /// Has at least one member record
    Active,
    /// Left the team or was banned
    Disqualified,
}

impl MemberStatus {
    /// Database representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Active => "ACTIVE",
            Self::Disqualified => "DISQUALIFIED",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ACTIVE" => Ok(Self::Active),
            "DISQUALIFIED" => Ok(Self::Disqualified),
            other => Err(Error::InvalidInput(format!("unknown member status '{other}'"))),
        }
    }
}

/// Membership tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipType {
    Basic,
    Gold,
}

impl MembershipType {
    /// Database representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "BASIC",
            Self::Gold => "GOLD",
        }
    }
}

impl FromStr for MembershipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BASIC" => Ok(Self::Basic),
            "GOLD" => Ok(Self::Gold),
            other => Err(Error::InvalidInput(format!(
                "unknown membership type '{other}'"
            ))),
        }
    }
}

/// A team member known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique identifier
    pub id: MemberId,
    /// Remote user id (unique)
    pub reference_id: i64,
    /// Remote username
    pub username: String,
    /// Display name, falls back to the username
    pub display_name: String,
    /// Membership tier
    pub membership: MembershipType,
    /// Lifecycle status
    pub status: MemberStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// Positive activity delta for one member between two chained snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Attempt that observed the delta
    pub attempt_id: AttemptId,
    /// Member the delta belongs to
    pub member_id: MemberId,
    /// Races played since the previous snapshot (always > 0)
    pub played: i64,
    /// Characters typed
    pub typed: i64,
    /// Typing errors
    pub errs: i64,
    /// Seconds raced
    pub secs: i64,
    /// Window start, the previous attempt's timestamp (Unix ms)
    pub from_at: i64,
    /// Window end, the current attempt's timestamp (Unix ms)
    pub to_at: i64,
}
