use chrono::{DateTime, Utc};

//
// ─── STREAK TRANSITIONS ────────────────────────────────────────────────────────
//

/// What happened to the streak counter during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Same-day revisit (or a clock running backwards): counter untouched.
    Kept,
    /// Consecutive-day engagement: counter incremented.
    Extended,
    /// A gap of more than one day: counter restarted at 1.
    Reset,
}

/// Result of a streak transition: the new counter plus what happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakOutcome {
    pub streak: u32,
    pub change: StreakChange,
}

/// Advance the consecutive-day streak counter from one visit to the next.
///
/// Elapsed days are the floored raw difference between the two instants in
/// whole 24-hour periods, not a calendar-date comparison: a visit 25 hours
/// after the last one counts as one elapsed day.
///
/// A negative difference (future-dated `last_visit`, i.e. clock skew) is
/// treated like a same-day revisit and leaves the counter unchanged.
#[must_use]
pub fn advance(previous: u32, last_visit: DateTime<Utc>, now: DateTime<Utc>) -> StreakOutcome {
    if now < last_visit {
        return StreakOutcome {
            streak: previous,
            change: StreakChange::Kept,
        };
    }

    match (now - last_visit).num_days() {
        0 => StreakOutcome {
            streak: previous,
            change: StreakChange::Kept,
        },
        1 => StreakOutcome {
            streak: previous.saturating_add(1),
            change: StreakChange::Extended,
        },
        _ => StreakOutcome {
            streak: 1,
            change: StreakChange::Reset,
        },
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn same_day_revisit_keeps_streak() {
        let t = fixed_now();
        let outcome = advance(5, t, t);
        assert_eq!(outcome.streak, 5);
        assert_eq!(outcome.change, StreakChange::Kept);

        let outcome = advance(5, t, t + Duration::hours(23));
        assert_eq!(outcome.streak, 5);
        assert_eq!(outcome.change, StreakChange::Kept);
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let t = fixed_now();
        let outcome = advance(5, t, t + Duration::hours(25));
        assert_eq!(outcome.streak, 6);
        assert_eq!(outcome.change, StreakChange::Extended);
    }

    #[test]
    fn exactly_24_hours_counts_as_next_day() {
        let t = fixed_now();
        let outcome = advance(5, t, t + Duration::hours(24));
        assert_eq!(outcome.streak, 6);
        assert_eq!(outcome.change, StreakChange::Extended);
    }

    #[test]
    fn gap_resets_streak_to_one() {
        let t = fixed_now();
        let outcome = advance(5, t, t + Duration::hours(50));
        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.change, StreakChange::Reset);
    }

    #[test]
    fn future_dated_last_visit_keeps_streak() {
        let t = fixed_now();
        let outcome = advance(5, t + Duration::hours(6), t);
        assert_eq!(outcome.streak, 5);
        assert_eq!(outcome.change, StreakChange::Kept);
    }
}
