//! Slot search for review scheduling.
//!
//! Walks forward from a search-start time in 30-minute steps across the
//! shop's active days, jitters each candidate by up to ±15 minutes, and
//! accepts the first candidate that stays inside the posting window and
//! keeps the minimum spacing from every already-scheduled timestamp.
//! Jittered candidates are re-validated in full, so jitter can never
//! smuggle a slot past the spacing floor or outside the window.

use chrono::{DateTime, Datelike, Days, Duration, NaiveTime, Utc, Weekday};
use rand::Rng;

use crate::settings::Cadence;

/// How many days ahead the slot search will look before giving up.
pub const SEARCH_HORIZON_DAYS: u64 = 42;
/// Candidate step size within a day's window.
pub const SLOT_STEP_MINUTES: i64 = 30;
/// Maximum jitter applied to a candidate, in either direction.
pub const JITTER_MINUTES: i64 = 15;
/// How many days of already-scheduled timestamps form the collision set.
pub const COLLISION_WINDOW_DAYS: u64 = 49;

/// Find the first valid posting slot at or after `search_start`.
///
/// Returns `None` when no candidate within [`SEARCH_HORIZON_DAYS`]
/// validates — the caller leaves the review unscheduled.
pub fn find_slot<R: Rng>(
    cadence: &Cadence,
    search_start: DateTime<Utc>,
    taken: &[DateTime<Utc>],
    rng: &mut R,
) -> Option<DateTime<Utc>> {
    for day_offset in 0..=SEARCH_HORIZON_DAYS {
        let date = search_start.date_naive().checked_add_days(Days::new(day_offset))?;
        if !cadence.is_active_day(date.weekday()) {
            continue;
        }

        let window_start = date.and_time(cadence.slot_start).and_utc();
        let window_end = date.and_time(cadence.slot_end).and_utc();

        // On the first day the search start may fall inside the window;
        // begin at the next step boundary instead of the window start.
        let mut cursor = if search_start > window_start {
            next_step_boundary(search_start)?
        } else {
            window_start
        };

        while cursor < window_end {
            let jitter = rng.random_range(-JITTER_MINUTES..=JITTER_MINUTES);
            let candidate = cursor + Duration::minutes(jitter);
            if is_valid_slot(cadence, candidate, taken) {
                return Some(candidate);
            }
            cursor += Duration::minutes(SLOT_STEP_MINUTES);
        }
    }

    None
}

/// A slot is valid when its weekday is active, its time-of-day falls in
/// `[slot_start, slot_end)`, and it keeps `min_hours_between` of absolute
/// distance from every timestamp in the collision set.
#[must_use]
pub fn is_valid_slot(cadence: &Cadence, candidate: DateTime<Utc>, taken: &[DateTime<Utc>]) -> bool {
    if !cadence.is_active_day(candidate.weekday()) {
        return false;
    }

    let time_of_day = candidate.time();
    if time_of_day < cadence.slot_start || time_of_day >= cadence.slot_end {
        return false;
    }

    let min_gap = Duration::hours(cadence.min_hours_between);
    taken
        .iter()
        .all(|scheduled| (candidate - *scheduled).abs() >= min_gap)
}

/// Monday 00:00 UTC of the calendar week containing `now`.
#[must_use]
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .week(Weekday::Mon)
        .first_day()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// End of the collision-lookback window: week start plus 49 days.
#[must_use]
pub fn collision_window_end(now: DateTime<Utc>) -> DateTime<Utc> {
    week_start(now) + Duration::days(i64::try_from(COLLISION_WINDOW_DAYS).unwrap_or(49))
}

/// The next multiple of [`SLOT_STEP_MINUTES`] at or after `t`.
fn next_step_boundary(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let step = SLOT_STEP_MINUTES * 60;
    let secs = t.timestamp();
    let rem = secs.rem_euclid(step);
    let boundary = if rem == 0 && t.timestamp_subsec_nanos() == 0 {
        secs
    } else {
        secs - rem + step
    };
    DateTime::from_timestamp(boundary, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Cadence;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn default_cadence() -> Cadence {
        Cadence::default()
    }

    #[test]
    fn next_step_boundary_rounds_up() {
        let t = utc(2026, 3, 2, 10, 17);
        assert_eq!(next_step_boundary(t).unwrap(), utc(2026, 3, 2, 10, 30));
    }

    #[test]
    fn next_step_boundary_keeps_exact_boundaries() {
        let t = utc(2026, 3, 2, 10, 30);
        assert_eq!(next_step_boundary(t).unwrap(), t);
    }

    #[test]
    fn monday_schedule_lands_on_next_tuesday_within_window() {
        // 2026-03-02 is a Monday; tue/wed/thu/sat are active.
        let search_start = utc(2026, 3, 2, 12, 30);
        let mut rng = StdRng::seed_from_u64(11);
        let slot = find_slot(&default_cadence(), search_start, &[], &mut rng)
            .expect("a free week must yield a slot");

        assert_eq!(slot.weekday(), Weekday::Tue);
        assert_eq!(slot.date_naive(), utc(2026, 3, 3, 0, 0).date_naive());
        assert!(slot.time() >= NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(slot.time() < NaiveTime::from_hms_opt(21, 0, 0).unwrap());
    }

    #[test]
    fn slot_respects_active_days_and_window_for_many_seeds() {
        let search_start = utc(2026, 3, 2, 8, 0);
        let cadence = default_cadence();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let slot = find_slot(&cadence, search_start, &[], &mut rng).expect("slot");
            assert!(cadence.is_active_day(slot.weekday()), "seed {seed}");
            assert!(slot.time() >= cadence.slot_start, "seed {seed}");
            assert!(slot.time() < cadence.slot_end, "seed {seed}");
        }
    }

    #[test]
    fn search_start_inside_window_starts_at_next_boundary() {
        // 2026-03-03 is a Tuesday; search starts 14:12, so nothing before
        // 14:30 minus jitter can be produced.
        let search_start = utc(2026, 3, 3, 14, 12);
        let mut rng = StdRng::seed_from_u64(3);
        let slot = find_slot(&default_cadence(), search_start, &[], &mut rng).expect("slot");
        assert!(slot >= utc(2026, 3, 3, 14, 15));
    }

    #[test]
    fn spacing_floor_holds_between_sequential_assignments() {
        // Scenario: two reviews scheduled back-to-back with a 4h floor and
        // ±15min jitter must still end up ≥ 4h apart.
        let cadence = default_cadence();
        let search_start = utc(2026, 3, 2, 7, 0);
        let mut rng = StdRng::seed_from_u64(42);

        let mut taken: Vec<DateTime<Utc>> = Vec::new();
        let first = find_slot(&cadence, search_start, &taken, &mut rng).expect("first slot");
        taken.push(first);
        let second = find_slot(&cadence, search_start, &taken, &mut rng).expect("second slot");

        let gap = (second - first).abs();
        assert!(
            gap >= Duration::hours(cadence.min_hours_between),
            "gap was {gap}"
        );
    }

    #[test]
    fn spacing_holds_across_a_full_batch() {
        let cadence = default_cadence();
        let search_start = utc(2026, 3, 2, 7, 0);
        let mut rng = StdRng::seed_from_u64(5);
        let mut taken: Vec<DateTime<Utc>> = Vec::new();

        for _ in 0..8 {
            if let Some(slot) = find_slot(&cadence, search_start, &taken, &mut rng) {
                taken.push(slot);
            }
        }

        for (i, a) in taken.iter().enumerate() {
            for b in &taken[i + 1..] {
                assert!((*a - *b).abs() >= Duration::hours(4), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn fully_packed_horizon_yields_none() {
        // One active day per week, a 2-hour window, and a spacing floor
        // wider than the window: a single existing slot per day blocks it.
        let cadence = Cadence {
            reviews_per_week: 2,
            active_days: vec![Weekday::Tue],
            slot_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            slot_end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            min_hours_between: 24,
        };

        // Occupy every Tuesday 10:00 inside the horizon.
        let mut taken = Vec::new();
        let first_tuesday = utc(2026, 3, 3, 10, 0);
        for week in 0..8 {
            taken.push(first_tuesday + Duration::weeks(week));
        }

        let mut rng = StdRng::seed_from_u64(9);
        let slot = find_slot(&cadence, utc(2026, 3, 2, 12, 0), &taken, &mut rng);
        assert!(slot.is_none());
    }

    #[test]
    fn is_valid_slot_rejects_inactive_weekday() {
        // 2026-03-02 is a Monday.
        assert!(!is_valid_slot(&default_cadence(), utc(2026, 3, 2, 10, 0), &[]));
    }

    #[test]
    fn is_valid_slot_rejects_window_end_boundary() {
        // The window is half-open: exactly 21:00 is out.
        assert!(!is_valid_slot(&default_cadence(), utc(2026, 3, 3, 21, 0), &[]));
        assert!(is_valid_slot(&default_cadence(), utc(2026, 3, 3, 9, 0), &[]));
    }

    #[test]
    fn is_valid_slot_enforces_min_spacing_both_directions() {
        let cadence = default_cadence();
        let taken = vec![utc(2026, 3, 3, 12, 0)];
        assert!(!is_valid_slot(&cadence, utc(2026, 3, 3, 14, 0), &taken));
        assert!(!is_valid_slot(&cadence, utc(2026, 3, 3, 10, 0), &taken));
        assert!(is_valid_slot(&cadence, utc(2026, 3, 3, 16, 0), &taken));
    }

    #[test]
    fn week_start_is_monday_midnight() {
        // 2026-03-05 is a Thursday.
        let start = week_start(utc(2026, 3, 5, 15, 42));
        assert_eq!(start, utc(2026, 3, 2, 0, 0));
        assert_eq!(start.weekday(), Weekday::Mon);

        // A Monday stays on its own week start.
        assert_eq!(week_start(utc(2026, 3, 2, 0, 0)), utc(2026, 3, 2, 0, 0));
    }

    #[test]
    fn collision_window_spans_seven_weeks() {
        let now = utc(2026, 3, 5, 15, 0);
        assert_eq!(collision_window_end(now) - week_start(now), Duration::days(49));
    }
}
