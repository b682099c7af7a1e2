use chrono::{DateTime, Duration, Utc};

/// Clock handle injected into services so tests can pin time.
///
/// The default variant reads the system clock; the fixed variant always
/// reports the instant it was created with (until advanced).
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// A clock backed by the system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// A clock pinned to the given instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Current time as this clock sees it.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a pinned clock forward by `delta`. No effect on a system
    /// clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests and examples (2025-01-15T12:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_736_942_400;

/// The fixed test timestamp as a `DateTime<Utc>`.
///
/// # Panics
///
/// Panics if the constant cannot be represented, which would mean the
/// constant itself is broken.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// A `Clock` pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn advance_moves_fixed_clock_only() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(25));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(25));

        let mut wall = Clock::default_clock();
        wall.advance(Duration::hours(25));
        assert!(matches!(wall, Clock::Default));
    }
}
