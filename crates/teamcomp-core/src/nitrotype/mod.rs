//! Remote team document model and racing statistic helpers.

mod client;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::models::MembershipType;

pub use client::{FetchError, HttpTeamFetcher, TeamFetcher};

/// Remote member status that disqualifies a member locally
pub const BANNED_STATUS: &str = "banned";

/// Response of `GET /api/teams/{tag}`
///
/// Every field the collector persists is modelled. Unknown fields are
/// dropped and `null` scalars read as their defaults, so re-serializing
/// yields a canonical document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub data: TeamData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamData {
    pub redirect_to_team: Option<String>,
    pub info: Option<TeamInfo>,
    #[serde(rename = "noTeam")]
    pub no_team: Option<bool>,
    #[serde(deserialize_with = "null_as_default")]
    pub members: Vec<TeamMember>,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: Vec<TeamStat>,
    #[serde(deserialize_with = "null_as_default")]
    pub season: Vec<TeamMemberSeason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamInfo {
    #[serde(rename = "teamID", deserialize_with = "null_as_default")]
    pub team_id: i64,
    #[serde(rename = "userID", deserialize_with = "null_as_default")]
    pub user_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tag_color: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub min_level: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub min_races: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub min_speed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub auto_remove: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub other_requirements: String,
    #[serde(deserialize_with = "null_as_default")]
    pub members: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub active_percent: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub searchable: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub enrollment: String,
    #[serde(deserialize_with = "null_as_default")]
    pub profile_views: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_activity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_modified: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_stamp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(rename = "userID", deserialize_with = "null_as_default")]
    pub user_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub membership: String,
    #[serde(deserialize_with = "null_as_default")]
    pub played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub typed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub errs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub secs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub join_stamp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_activity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub races_played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_speed: i64,
    #[serde(rename = "carID", deserialize_with = "null_as_default")]
    pub car_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub car_hue_angle: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_login: i64,
}

/// A member's standing in the current season
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamMemberSeason {
    #[serde(rename = "userID", deserialize_with = "null_as_default")]
    pub user_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub membership: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub typed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub errs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub secs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub points: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_activity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub races_played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_speed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_login: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStat {
    #[serde(deserialize_with = "null_as_default")]
    pub board: String,
    #[serde(deserialize_with = "null_as_default")]
    pub played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub typed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub errs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub secs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub stamp: i64,
}

impl TeamResponse {
    /// Parse a raw team document
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize with a fixed field order so equal documents hash equally
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Remote team id, when the document carries team info
    pub fn team_id(&self) -> Option<i64> {
        self.data.info.as_ref().map(|info| info.team_id)
    }
}

impl TeamMember {
    /// Display name, falling back to the username when blank
    pub fn display_name_or_username(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    pub fn membership_type(&self) -> MembershipType {
        if self.membership.eq_ignore_ascii_case("gold") {
            MembershipType::Gold
        } else {
            MembershipType::Basic
        }
    }

    pub fn is_banned(&self) -> bool {
        self.status.eq_ignore_ascii_case(BANNED_STATUS)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Average words per minute, five characters to a word
#[allow(clippy::cast_precision_loss)]
pub fn words_per_minute(typed: i64, secs: i64) -> f64 {
    if secs == 0 {
        return 0.0;
    }
    typed as f64 / 5.0 / (secs as f64 / 60.0)
}

/// Accuracy percentage from typed characters and errors
#[allow(clippy::cast_precision_loss)]
pub fn accuracy(typed: i64, errs: i64) -> f64 {
    if typed == 0 {
        return 0.0;
    }
    (1.0 - errs as f64 / typed as f64) * 100.0
}

/// Points earned over `races` at the given speed and accuracy
#[allow(clippy::cast_precision_loss)]
pub fn points(races: i64, wpm: f64, accuracy: f64) -> f64 {
    if races == 0 {
        return 0.0;
    }
    (100.0 + wpm / 2.0) * (accuracy / 100.0) * races as f64
}
