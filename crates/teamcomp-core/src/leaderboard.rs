//! Competition scoring.
//!
//! Member records are attributed to the competition whose window contains
//! the record's start. Each category is ranked independently and the rank is
//! turned into reward points through the competition's schedule and
//! multiplier.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{reward_for_rank, Competition, Member, MemberId, MemberRecord, MemberStatus};
use crate::nitrotype::{accuracy, points, words_per_minute};

/// Rank and reward for one scoring category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryScore<T> {
    pub value: T,
    pub rank: usize,
    pub reward: i64,
}

/// One member's standing in a competition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub member_id: MemberId,
    pub username: String,
    pub display_name: String,
    pub typed: i64,
    pub errs: i64,
    pub secs: i64,
    pub grind: CategoryScore<i64>,
    pub speed: CategoryScore<f64>,
    pub accuracy: CategoryScore<f64>,
    pub points: CategoryScore<f64>,
}

impl LeaderboardEntry {
    /// Sum of the rewards over every category
    pub const fn total_reward(&self) -> i64 {
        self.grind.reward + self.speed.reward + self.accuracy.reward + self.points.reward
    }
}

/// Ranked standings of one competition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub competition: Competition,
    pub entries: Vec<LeaderboardEntry>,
}

/// Rewards collected by one member across finished competitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTotal {
    pub member_id: MemberId,
    pub username: String,
    pub display_name: String,
    pub competitions: usize,
    pub reward: i64,
}

#[derive(Default)]
struct Aggregate {
    played: i64,
    typed: i64,
    errs: i64,
    secs: i64,
}

impl Leaderboard {
    /// Score `records` against `competition`
    ///
    /// Records outside the window and disqualified members are ignored.
    pub fn compute(competition: &Competition, members: &[Member], records: &[MemberRecord]) -> Self {
        let eligible: HashMap<MemberId, &Member> = members
            .iter()
            .filter(|member| member.status != MemberStatus::Disqualified)
            .map(|member| (member.id, member))
            .collect();

        let mut aggregates: BTreeMap<MemberId, Aggregate> = BTreeMap::new();
        for record in records {
            if !competition.contains(record.from_at) || !eligible.contains_key(&record.member_id) {
                continue;
            }
            let aggregate = aggregates.entry(record.member_id).or_default();
            aggregate.played += record.played;
            aggregate.typed += record.typed;
            aggregate.errs += record.errs;
            aggregate.secs += record.secs;
        }

        let mut entries: Vec<LeaderboardEntry> = aggregates
            .into_iter()
            .filter_map(|(member_id, aggregate)| {
                let member = eligible.get(&member_id)?;
                let wpm = words_per_minute(aggregate.typed, aggregate.secs);
                let acc = accuracy(aggregate.typed, aggregate.errs);
                Some(LeaderboardEntry {
                    member_id,
                    username: member.username.clone(),
                    display_name: member.display_name.clone(),
                    typed: aggregate.typed,
                    errs: aggregate.errs,
                    secs: aggregate.secs,
                    grind: unranked(aggregate.played),
                    speed: unranked(wpm),
                    accuracy: unranked(acc),
                    points: unranked(points(aggregate.played, wpm, acc)),
                })
            })
            .collect();

        let rewards = &competition.rewards;
        let multiplier = competition.multiplier;
        rank_by(&mut entries, |entry| &mut entry.grind, i64::cmp, &rewards.grind, multiplier);
        rank_by(&mut entries, |entry| &mut entry.speed, f64::total_cmp, &rewards.speed, multiplier);
        rank_by(
            &mut entries,
            |entry| &mut entry.accuracy,
            f64::total_cmp,
            &rewards.accuracy,
            multiplier,
        );
        rank_by(&mut entries, |entry| &mut entry.points, f64::total_cmp, &rewards.point, multiplier);

        entries.sort_by(|a, b| {
            b.total_reward()
                .cmp(&a.total_reward())
                .then_with(|| a.username.cmp(&b.username))
        });

        Self {
            competition: competition.clone(),
            entries,
        }
    }
}

const fn unranked<T>(value: T) -> CategoryScore<T> {
    CategoryScore {
        value,
        rank: 0,
        reward: 0,
    }
}

/// Rank one category descending, ties ordered by username
fn rank_by<T: Copy>(
    entries: &mut [LeaderboardEntry],
    field: fn(&mut LeaderboardEntry) -> &mut CategoryScore<T>,
    compare: fn(&T, &T) -> Ordering,
    schedule: &[i64],
    multiplier: i64,
) {
    let values: Vec<T> = entries.iter_mut().map(|entry| field(entry).value).collect();
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        compare(&values[b], &values[a]).then_with(|| entries[a].username.cmp(&entries[b].username))
    });

    for (position, index) in order.into_iter().enumerate() {
        let rank = position + 1;
        let category = field(&mut entries[index]);
        category.rank = rank;
        category.reward = reward_for_rank(schedule, rank) * multiplier;
    }
}

/// Total rewards per member across the given leaderboards
pub fn totals(leaderboards: &[Leaderboard]) -> Vec<MemberTotal> {
    let mut totals: HashMap<MemberId, MemberTotal> = HashMap::new();
    for board in leaderboards {
        for entry in &board.entries {
            let total = totals.entry(entry.member_id).or_insert_with(|| MemberTotal {
                member_id: entry.member_id,
                username: entry.username.clone(),
                display_name: entry.display_name.clone(),
                competitions: 0,
                reward: 0,
            });
            total.competitions += 1;
            total.reward += entry.total_reward();
        }
    }

    let mut totals: Vec<MemberTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| b.reward.cmp(&a.reward).then_with(|| a.username.cmp(&b.username)));
    totals
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{AttemptId, MembershipType, RewardSchedule};

    fn member(username: &str, status: MemberStatus) -> Member {
        Member {
            id: MemberId::new(),
            reference_id: 0,
            username: username.to_string(),
            display_name: username.to_string(),
            membership: MembershipType::Basic,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn record(member: &Member, played: i64, typed: i64, errs: i64, from_at: i64) -> MemberRecord {
        MemberRecord {
            attempt_id: AttemptId::new(),
            member_id: member.id,
            played,
            typed,
            errs,
            secs: 60,
            from_at,
            to_at: from_at + 600,
        }
    }

    #[test]
    fn ranks_each_category_and_applies_multiplier() {
        let competition = Competition::draft(0, 600, 2, RewardSchedule::default());
        let fast = member("fast", MemberStatus::Active);
        let grinder = member("grinder", MemberStatus::Active);

        let records = vec![
            record(&fast, 2, 1000, 0, 0),
            record(&grinder, 10, 500, 50, 100),
        ];
        let board = Leaderboard::compute(&competition, &[fast.clone(), grinder.clone()], &records);

        assert_eq!(board.entries.len(), 2);
        let fast_entry = board.entries.iter().find(|e| e.member_id == fast.id).unwrap();
        let grinder_entry = board.entries.iter().find(|e| e.member_id == grinder.id).unwrap();

        assert_eq!(grinder_entry.grind.rank, 1);
        assert_eq!(grinder_entry.grind.reward, 20);
        assert_eq!(fast_entry.grind.rank, 2);
        assert_eq!(fast_entry.grind.reward, 14);

        assert_eq!(fast_entry.speed.rank, 1);
        assert_eq!(fast_entry.accuracy.rank, 1);
        assert_eq!(grinder_entry.speed.reward, 14);
    }

    #[test]
    fn ignores_disqualified_members_and_records_outside_window() {
        let competition = Competition::draft(0, 600, 1, RewardSchedule::default());
        let active = member("active", MemberStatus::Active);
        let banned = member("banned", MemberStatus::Disqualified);

        let records = vec![
            record(&active, 1, 100, 0, 0),
            record(&active, 5, 500, 0, 600),
            record(&banned, 9, 900, 0, 0),
        ];
        let board = Leaderboard::compute(&competition, &[active.clone(), banned], &records);

        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].member_id, active.id);
        assert_eq!(board.entries[0].grind.value, 1);
        assert_eq!(board.entries[0].total_reward(), 40);
    }

    #[test]
    fn ties_are_broken_by_username() {
        let competition = Competition::draft(0, 600, 1, RewardSchedule::default());
        let bravo = member("bravo", MemberStatus::Active);
        let alpha = member("alpha", MemberStatus::Active);

        let records = vec![record(&bravo, 3, 300, 3, 0), record(&alpha, 3, 300, 3, 0)];
        let board = Leaderboard::compute(&competition, &[bravo, alpha], &records);

        assert_eq!(board.entries[0].username, "alpha");
        assert_eq!(board.entries[0].grind.rank, 1);
        assert_eq!(board.entries[1].grind.rank, 2);
    }

    #[test]
    fn totals_sum_rewards_across_competitions() {
        let alpha = member("alpha", MemberStatus::Active);
        let first = Competition::draft(0, 600, 1, RewardSchedule::default());
        let second = Competition::draft(600, 1200, 1, RewardSchedule::default());

        let boards = vec![
            Leaderboard::compute(&first, &[alpha.clone()], &[record(&alpha, 1, 100, 0, 0)]),
            Leaderboard::compute(&second, &[alpha.clone()], &[record(&alpha, 1, 100, 0, 600)]),
        ];

        let totals = totals(&boards);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].competitions, 2);
        assert_eq!(totals[0].reward, 80);
    }
}
