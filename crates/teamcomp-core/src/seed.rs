//! Ahead-of-time creation of competition windows.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{Error, Result};
use crate::models::{Competition, RewardSchedule};
use crate::util::window_boundary;

/// Length of one competition window
pub const COMPETITION_LENGTH_MINUTES: i64 = 10;

/// Draw a reward multiplier: mostly 1, occasionally 2, 4 or 8
pub fn draw_multiplier(rng: &mut impl Rng) -> i64 {
    match rng.gen_range(0..100) {
        0..=5 => 8,
        6..=10 => 4,
        11..=20 => 2,
        _ => 1,
    }
}

/// Plan consecutive draft competitions covering `[from, to)`
///
/// Both bounds snap to the `:x1` minute of their ten-minute block first.
/// A range inside a single block still gets one competition; a reversed
/// range is rejected.
pub fn plan_competitions(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<Vec<Competition>> {
    let start = window_boundary(from);
    let end = window_boundary(to);
    if end < start {
        return Err(Error::InvalidInput(format!(
            "seed range {start} .. {end} ends before it starts"
        )));
    }

    let step = Duration::minutes(COMPETITION_LENGTH_MINUTES);
    let mut competitions = Vec::new();
    let mut from_at = start;
    loop {
        let to_at = from_at + step;
        competitions.push(Competition::draft(
            from_at.timestamp_millis(),
            to_at.timestamp_millis(),
            draw_multiplier(rng),
            RewardSchedule::default(),
        ));
        from_at = to_at;
        if from_at >= end {
            break;
        }
    }

    Ok(competitions)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::CompetitionStatus;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 12, 24, hour, minute, 0).unwrap()
    }

    #[test]
    fn plans_consecutive_ten_minute_windows() {
        let mut rng = StdRng::seed_from_u64(7);
        let competitions = plan_competitions(at(12, 7), at(13, 3), &mut rng).unwrap();

        assert_eq!(competitions.len(), 6);
        assert_eq!(competitions[0].from_at, at(12, 1).timestamp_millis());
        assert_eq!(competitions[5].to_at, at(13, 1).timestamp_millis());
        for pair in competitions.windows(2) {
            assert_eq!(pair[0].to_at, pair[1].from_at);
        }
        assert!(competitions
            .iter()
            .all(|competition| competition.status == CompetitionStatus::Draft));
    }

    #[test]
    fn range_within_one_block_plans_one_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let competitions = plan_competitions(at(12, 1), at(12, 9), &mut rng).unwrap();

        assert_eq!(competitions.len(), 1);
        assert_eq!(competitions[0].from_at, at(12, 1).timestamp_millis());
        assert_eq!(competitions[0].to_at, at(12, 11).timestamp_millis());
    }

    #[test]
    fn rejects_reversed_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = plan_competitions(at(13, 1), at(12, 1), &mut rng);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn multipliers_come_from_the_fixed_set() {
        let mut rng = StdRng::seed_from_u64(42);
        let drawn: Vec<i64> = (0..500).map(|_| draw_multiplier(&mut rng)).collect();
        assert!(drawn.iter().all(|value| [1, 2, 4, 8].contains(value)));
        assert!(drawn.contains(&1));
        assert!(drawn.contains(&8));
    }
}
