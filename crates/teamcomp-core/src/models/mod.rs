//! Data models for teamcomp

#[macro_use]
mod id;
mod attempt;
mod competition;
mod member;
mod snapshot;

pub use attempt::{AttemptId, Classification, SyncAttempt};
pub use competition::{
    reward_for_rank, Competition, CompetitionId, CompetitionStatus, RewardSchedule, DEFAULT_REWARDS,
};
pub use member::{Member, MemberId, MemberRecord, MemberStatus, MembershipType};
pub use snapshot::{Snapshot, SnapshotId};
