//! Member activity deltas between two chained snapshots.

use std::collections::{HashMap, HashSet};

use libsql::Connection;
use serde::Serialize;

use crate::db::{LibSqlMemberRepository, MemberRepository};
use crate::error::Result;
use crate::models::{AttemptId, MemberRecord, SyncAttempt};
use crate::nitrotype::{TeamMember, TeamResponse};

/// Raw counter differences for one member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberDelta {
    pub reference_id: i64,
    pub played: i64,
    pub typed: i64,
    pub errs: i64,
    pub secs: i64,
}

/// Everything the delta transaction writes for one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaPlan {
    pub attempt_id: AttemptId,
    pub from_at: i64,
    pub to_at: i64,
    /// Members observed in the current document
    pub members: Vec<TeamMember>,
    /// Members with a strictly positive play delta
    pub deltas: Vec<MemberDelta>,
    /// Remote user ids that left the team or are banned
    pub disqualify: Vec<i64>,
}

/// Counts of rows touched by one delta transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeltaSummary {
    pub members: usize,
    pub records: usize,
    pub promoted: u64,
    pub disqualified: u64,
}

impl DeltaPlan {
    /// Build the plan for `current` observed after `previous`
    ///
    /// Without a previous attempt the plan only registers members.
    pub fn build(
        previous_attempt: Option<&SyncAttempt>,
        current_attempt: &SyncAttempt,
        previous: &TeamResponse,
        current: &TeamResponse,
    ) -> Self {
        Self {
            attempt_id: current_attempt.id,
            from_at: previous_attempt.map_or(current_attempt.created_at, |attempt| attempt.created_at),
            to_at: current_attempt.created_at,
            members: distinct_members(current).into_iter().cloned().collect(),
            deltas: compute_deltas(previous, current),
            disqualify: disqualified_members(previous, current),
        }
    }
}

/// Per-member counter deltas, keeping only members whose play count grew
pub fn compute_deltas(previous: &TeamResponse, current: &TeamResponse) -> Vec<MemberDelta> {
    let before: HashMap<i64, &TeamMember> = distinct_members(previous)
        .into_iter()
        .map(|member| (member.user_id, member))
        .collect();

    distinct_members(current)
        .into_iter()
        .filter_map(|now| {
            let then = before.get(&now.user_id)?;
            let delta = MemberDelta {
                reference_id: now.user_id,
                played: now.played - then.played,
                typed: now.typed - then.typed,
                errs: now.errs - then.errs,
                secs: now.secs - then.secs,
            };
            (delta.played > 0).then_some(delta)
        })
        .collect()
}

/// Members in document order, keeping the first entry per user id
fn distinct_members(team: &TeamResponse) -> Vec<&TeamMember> {
    let mut seen = HashSet::new();
    team.data
        .members
        .iter()
        .filter(|member| seen.insert(member.user_id))
        .collect()
}

/// Members present before but missing now, plus members banned now
pub fn disqualified_members(previous: &TeamResponse, current: &TeamResponse) -> Vec<i64> {
    let present: HashSet<i64> = current
        .data
        .members
        .iter()
        .map(|member| member.user_id)
        .collect();

    let departed = previous
        .data
        .members
        .iter()
        .map(|member| member.user_id)
        .filter(|user_id| !present.contains(user_id));
    let banned = current
        .data
        .members
        .iter()
        .filter(|member| member.is_banned())
        .map(|member| member.user_id);

    let mut ids: Vec<i64> = departed.chain(banned).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Write a plan through `conn`; the caller owns the transaction
pub(crate) async fn apply(conn: &Connection, plan: &DeltaPlan, now: i64) -> Result<DeltaSummary> {
    let repo = LibSqlMemberRepository::new(conn);

    let mut member_ids = HashMap::with_capacity(plan.members.len());
    for remote in &plan.members {
        let member = repo.upsert(remote, now).await?;
        member_ids.insert(member.reference_id, member.id);
    }

    let mut records = 0;
    for delta in &plan.deltas {
        let Some(member_id) = member_ids.get(&delta.reference_id) else {
            continue;
        };
        repo.insert_record(&MemberRecord {
            attempt_id: plan.attempt_id,
            member_id: *member_id,
            played: delta.played,
            typed: delta.typed,
            errs: delta.errs,
            secs: delta.secs,
            from_at: plan.from_at,
            to_at: plan.to_at,
        })
        .await?;
        records += 1;
    }

    let promoted = repo.promote_recorded(&plan.attempt_id, now).await?;
    let disqualified = repo.disqualify(&plan.disqualify, now).await?;

    Ok(DeltaSummary {
        members: plan.members.len(),
        records,
        promoted,
        disqualified,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::Classification;

    fn member(user_id: i64, played: i64) -> TeamMember {
        TeamMember {
            user_id,
            username: format!("user{user_id}"),
            played,
            typed: played * 100,
            errs: played,
            secs: played * 30,
            status: "active".to_string(),
            ..TeamMember::default()
        }
    }

    fn team(members: Vec<TeamMember>) -> TeamResponse {
        let mut response = TeamResponse {
            success: true,
            ..TeamResponse::default()
        };
        response.data.members = members;
        response
    }

    #[test]
    fn only_positive_play_deltas_are_kept() {
        let previous = team(vec![member(1, 100), member(2, 50), member(3, 40)]);
        let current = team(vec![member(1, 150), member(2, 50), member(3, 10), member(4, 5)]);

        let deltas = compute_deltas(&previous, &current);
        assert_eq!(
            deltas,
            vec![MemberDelta {
                reference_id: 1,
                played: 50,
                typed: 5000,
                errs: 50,
                secs: 1500,
            }]
        );
    }

    #[test]
    fn repeated_user_ids_yield_one_delta() {
        let previous = team(vec![member(1, 100), member(1, 100)]);
        let current = team(vec![member(1, 130), member(1, 170), member(2, 5)]);

        let deltas = compute_deltas(&previous, &current);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].played, 30);

        let first = SyncAttempt::next(None, None, Classification::New, "New log download", 100);
        let second =
            SyncAttempt::next(Some(&first), None, Classification::New, "New log download", 700);
        let plan = DeltaPlan::build(Some(&first), &second, &previous, &current);
        let ids: Vec<i64> = plan.members.iter().map(|member| member.user_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn departed_and_banned_members_are_disqualified() {
        let previous = team(vec![member(1, 1), member(2, 1), member(3, 1)]);
        let mut banned = member(3, 1);
        banned.status = "banned".to_string();
        let current = team(vec![member(1, 1), banned]);

        assert_eq!(disqualified_members(&previous, &current), vec![2, 3]);
    }

    #[test]
    fn plan_window_spans_both_attempts() {
        let first = SyncAttempt::next(None, None, Classification::New, "New log download", 100);
        let second =
            SyncAttempt::next(Some(&first), None, Classification::New, "New log download", 700);
        let plan = DeltaPlan::build(
            Some(&first),
            &second,
            &team(vec![member(1, 1)]),
            &team(vec![member(1, 2)]),
        );

        assert_eq!(plan.attempt_id, second.id);
        assert_eq!((plan.from_at, plan.to_at), (100, 700));
        assert_eq!(plan.deltas.len(), 1);
        assert!(plan.disqualify.is_empty());
    }

    #[test]
    fn first_plan_registers_members_only() {
        let first = SyncAttempt::next(None, None, Classification::New, "New log download", 100);
        let plan = DeltaPlan::build(
            None,
            &first,
            &TeamResponse::default(),
            &team(vec![member(1, 10), member(2, 20)]),
        );

        assert_eq!(plan.members.len(), 2);
        assert!(plan.deltas.is_empty());
        assert!(plan.disqualify.is_empty());
        assert_eq!((plan.from_at, plan.to_at), (100, 100));
    }
}
