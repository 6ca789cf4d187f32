use chrono::{DateTime, Utc};

/// Source of "now" for progress timestamps.
///
/// Services hold one of these so tests can pin `startedAt`, `lastActiveAt`
/// and `completedAt` to known values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Wall-clock time.
    #[default]
    System,
    /// Always reports the same instant.
    Pinned(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn pinned(at: DateTime<Utc>) -> Self {
        Self::Pinned(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Pinned(at) => *at,
        }
    }
}

/// 2023-11-14T22:13:20Z, the instant every test clock is pinned to.
const TEST_EPOCH_SECS: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the test instant cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(TEST_EPOCH_SECS, 0).expect("test instant is in range")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::pinned(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_clock_does_not_move() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn system_clock_is_the_default() {
        assert_eq!(Clock::default(), Clock::system());
        assert!(Clock::system().now() > fixed_now());
    }
}
