//! # Gatherly Testing
//!
//! Testing utilities and helpers for Gatherly.
//!
//! This crate provides:
//! - Deterministic clocks implementing [`Clock`]
//! - Fixtures for events and RSVP snapshots
//! - proptest strategies for domain types
//!
//! ## Example
//!
//! ```
//! use gatherly_core::capacity;
//! use gatherly_core::environment::Clock;
//! use gatherly_core::types::RsvpStatus;
//! use gatherly_testing::{fixtures, test_clock};
//!
//! let clock = test_clock();
//! let event = fixtures::event_with_capacity(2, clock.now());
//! let rsvps = fixtures::rsvps(&event, &[RsvpStatus::Going, RsvpStatus::Going], clock.now());
//!
//! assert!(capacity::get_capacity_info(&event, &rsvps).is_at_capacity);
//! ```

use chrono::{DateTime, Utc};
use gatherly_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use gatherly_testing::mocks::FixedClock;
    /// use gatherly_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can hold one handle while the
    /// service under test holds another.
    ///
    /// ```
    /// use gatherly_testing::mocks::MutableClock;
    /// use gatherly_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = MutableClock::new(start);
    /// let handle = clock.clone();
    ///
    /// handle.advance(Duration::hours(1));
    /// assert_eq!(clock.now(), start + Duration::hours(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct MutableClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MutableClock {
        /// Create a clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for MutableClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant [`test_clock`] is pinned to.
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Builders for common test data.
pub mod fixtures {
    use super::{DateTime, Utc};
    use chrono::Duration;
    use gatherly_core::types::{Event, EventRsvp, GroupId, RsvpStatus, UserId};

    /// An unlimited public event starting a week after `now`.
    #[must_use]
    pub fn event(now: DateTime<Utc>) -> Event {
        Event::builder(UserId::new(), "Test event", now + Duration::days(7)).build()
    }

    /// An event with a seat limit, starting a week after `now`.
    #[must_use]
    pub fn event_with_capacity(capacity: u32, now: DateTime<Utc>) -> Event {
        Event::builder(UserId::new(), "Test event", now + Duration::days(7))
            .capacity(capacity)
            .build()
    }

    /// An unlimited event owned by a group.
    #[must_use]
    pub fn group_event(group_id: GroupId, host_id: UserId, now: DateTime<Utc>) -> Event {
        Event::builder(host_id, "Group meetup", now + Duration::days(7))
            .group(group_id)
            .build()
    }

    /// A single RSVP for a fresh user.
    #[must_use]
    pub fn rsvp(event: &Event, status: RsvpStatus, created_at: DateTime<Utc>) -> EventRsvp {
        EventRsvp::new(event.id, UserId::new(), status, created_at)
    }

    /// One RSVP per status, each a second after the previous.
    ///
    /// The resulting order is the FIFO order.
    #[must_use]
    pub fn rsvps(event: &Event, statuses: &[RsvpStatus], start: DateTime<Utc>) -> Vec<EventRsvp> {
        statuses
            .iter()
            .zip(0_i64..)
            .map(|(status, offset)| rsvp(event, *status, start + Duration::seconds(offset)))
            .collect()
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use gatherly_core::types::RsvpStatus;
    use proptest::prelude::*;

    /// Any RSVP status.
    pub fn any_status() -> impl Strategy<Value = RsvpStatus> {
        prop_oneof![
            Just(RsvpStatus::Going),
            Just(RsvpStatus::Interested),
            Just(RsvpStatus::Declined),
            Just(RsvpStatus::Waitlisted),
        ]
    }

    /// A status a client may request.
    pub fn requestable_status() -> impl Strategy<Value = RsvpStatus> {
        prop_oneof![
            3 => Just(RsvpStatus::Going),
            1 => Just(RsvpStatus::Interested),
            1 => Just(RsvpStatus::Declined),
        ]
    }

    /// Optional seat limit, `None` for unlimited.
    pub fn capacity() -> impl Strategy<Value = Option<u32>> {
        prop_oneof![
            1 => Just(None),
            4 => (0_u32..8).prop_map(Some),
        ]
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatherly=debug".into()),
        )
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, MutableClock, test_clock, test_time};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gatherly_core::types::RsvpStatus;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), test_time());
    }

    #[test]
    fn test_mutable_clock_shared_between_clones() {
        let clock = MutableClock::new(test_time());
        let other = clock.clone();

        other.advance(Duration::minutes(30));

        assert_eq!(clock.now(), test_time() + Duration::minutes(30));
    }

    #[test]
    fn test_rsvps_fixture_orders_by_creation() {
        let now = test_time();
        let event = fixtures::event(now);
        let rsvps = fixtures::rsvps(
            &event,
            &[RsvpStatus::Going, RsvpStatus::Waitlisted, RsvpStatus::Waitlisted],
            now,
        );

        assert_eq!(rsvps.len(), 3);
        assert!(rsvps.windows(2).all(|w| w[0].created_at < w[1].created_at));
        assert!(rsvps.iter().all(|r| r.event_id == event.id));
    }
}
