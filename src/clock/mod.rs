//! Wall-clock abstraction and shared time/SLA math
//!
//! SLA breach and overdue values are computed on every read from the current
//! wall-clock time; there is no background scheduler. Injecting `Clock` keeps
//! that math deterministic under test.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic tests
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at the given instant
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    /// Advance the clock by a delta
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Whole hours elapsed between `then` and `now`
pub fn hours_since(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_hours()
}

/// Whole days elapsed between `then` and `now` (negative when `then` is in
/// the future)
pub fn days_since(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_days()
}

/// Days remaining until `deadline`, rounded up, floored at zero
pub fn days_until_ceil(now: DateTime<Utc>, deadline: DateTime<Utc>) -> i64 {
    let secs = (deadline - now).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::at(instant());
        assert_eq!(clock.now(), instant());

        clock.advance(Duration::hours(30));
        assert_eq!(clock.now(), instant() + Duration::hours(30));
    }

    #[test]
    fn test_hours_since_truncates() {
        let now = instant() + Duration::hours(30) + Duration::minutes(59);
        assert_eq!(hours_since(now, instant()), 30);
    }

    #[test]
    fn test_days_since_signed() {
        assert_eq!(days_since(instant() + Duration::days(3), instant()), 3);
        assert_eq!(days_since(instant(), instant() + Duration::days(3)), -3);
        // A partial day does not count as a full day elapsed
        assert_eq!(days_since(instant() + Duration::hours(23), instant()), 0);
    }

    #[test]
    fn test_days_until_ceil_rounds_up() {
        let deadline = instant() + Duration::days(6) + Duration::hours(1);
        assert_eq!(days_until_ceil(instant(), deadline), 7);
        assert_eq!(days_until_ceil(instant(), instant() + Duration::days(42)), 42);
    }

    #[test]
    fn test_days_until_ceil_floors_at_zero() {
        assert_eq!(days_until_ceil(instant(), instant() - Duration::days(2)), 0);
        assert_eq!(days_until_ceil(instant(), instant()), 0);
    }
}
