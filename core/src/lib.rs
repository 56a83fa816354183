//! # Gatherly Core
//!
//! Domain types and pure decision logic for the Gatherly RSVP engine.
//!
//! This crate contains no I/O. Everything here is a deterministic function of
//! its inputs, which keeps the capacity rules and the notification state
//! machine testable at memory speed.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, events, RSVPs and group roles
//! - [`validation`]: field validators applied before data enters the engine
//! - [`capacity`]: the capacity & waitlist engine (seat vs. waitlist, FIFO promotion)
//! - [`notification`]: the notification record, its payloads and lifecycle
//! - [`reducer`]: the [`Reducer`](reducer::Reducer) trait and the RSVP reducer built on the capacity engine
//! - [`environment`]: the injected [`Clock`](environment::Clock)
//! - [`error`]: typed errors for all of the above
//!
//! ## Example
//!
//! ```
//! use gatherly_core::capacity;
//! use gatherly_core::types::{Event, RsvpStatus, UserId};
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let event = Event::builder(UserId::new(), "Board games", now + Duration::days(1))
//!     .capacity(1)
//!     .build();
//!
//! let first = capacity::process_new_rsvp(&event, &[], UserId::new(), RsvpStatus::Going, now)
//!     .expect("first RSVP is accepted");
//! assert!(!first.was_waitlisted);
//!
//! let second = capacity::process_new_rsvp(
//!     &event,
//!     std::slice::from_ref(&first.rsvp),
//!     UserId::new(),
//!     RsvpStatus::Going,
//!     now,
//! )
//! .expect("second RSVP is accepted");
//! assert!(second.was_waitlisted);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod capacity;
pub mod error;
pub mod notification;
pub mod reducer;
pub mod types;
pub mod validation;

pub use capacity::{Availability, CapacityInfo, RsvpOutcome, WithdrawOutcome};
pub use error::{LifecycleError, RsvpError, ValidationError};
pub use reducer::{Reducer, RsvpAction, RsvpDecision, RsvpEffect, RsvpReducer, RsvpState};
pub use notification::{
    MAX_RETRIES, Notification, NotificationId, NotificationPayload, NotificationStatus,
    NotificationType,
};
pub use types::{
    Coordinates, Event, EventId, EventRsvp, GroupId, GroupRole, RsvpStatus, UserId, Visibility,
};

/// Environment module - injected dependencies for time.
///
/// Pure functions in this crate take `now` as an argument; services built on
/// top of them obtain it from a [`Clock`](environment::Clock) so tests can pin
/// time.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use gatherly_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = chrono::Utc::now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
