//! Error types for the RSVP engine and notification lifecycle.

use crate::types::UserId;
use thiserror::Error;

/// Domain rule violations raised by the capacity & waitlist engine.
///
/// These are always returned as values; the boundary layer decides how to
/// present them (for HTTP this is usually a 409 Conflict).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RsvpError {
    /// The user already has an RSVP for this event.
    #[error("User {user_id} has already RSVPed to this event")]
    AlreadyRsvped {
        /// User that tried to RSVP twice
        user_id: UserId,
    },

    /// The user has no RSVP to update or withdraw.
    #[error("User {user_id} has not RSVPed to this event")]
    NotRsvped {
        /// User without an RSVP
        user_id: UserId,
    },

    /// Every seat is taken.
    #[error("Event is at capacity ({capacity} seats)")]
    EventAtCapacity {
        /// Seat limit of the event
        capacity: u32,
    },

    /// The user cannot be moved from the waitlist to a seat.
    #[error("Cannot promote user {user_id} from waitlist: {reason}")]
    CannotPromoteFromWaitlist {
        /// User that could not be promoted
        user_id: UserId,
        /// Why the promotion was refused
        reason: String,
    },
}

/// Field validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Unknown RSVP status string.
    #[error("Invalid RSVP status: {0}")]
    InvalidRsvpStatus(String),

    /// The status may exist but clients cannot request it.
    #[error("RSVP status '{0}' cannot be requested directly")]
    StatusNotRequestable(String),

    /// Unknown visibility string.
    #[error("Invalid visibility: {0}")]
    InvalidVisibility(String),

    /// Unknown group role string.
    #[error("Invalid group role: {0}")]
    InvalidGroupRole(String),

    /// Unknown notification type string.
    #[error("Invalid notification type: {0}")]
    InvalidNotificationType(String),

    /// Unknown notification status string.
    #[error("Invalid notification status: {0}")]
    InvalidNotificationStatus(String),

    /// Latitude outside -90..=90 or not finite.
    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(String),

    /// Longitude outside -180..=180 or not finite.
    #[error("Longitude out of range: {0}")]
    LongitudeOutOfRange(String),

    /// Event ends before (or when) it starts.
    #[error("Event must start before it ends")]
    InvalidTimeRange,

    /// A required text field is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Offending field
        field: &'static str,
    },

    /// A text field exceeds its length limit.
    #[error("{field} exceeds {max} characters")]
    TooLong {
        /// Offending field
        field: &'static str,
        /// Limit in characters
        max: usize,
    },

    /// A token contains characters it must not.
    #[error("{field} contains invalid characters")]
    InvalidCharacters {
        /// Offending field
        field: &'static str,
    },

    /// A payload could not be decoded for its declared type.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Illegal notification state transitions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The notification was already delivered.
    #[error("Notification has already been sent")]
    AlreadySent,

    /// The notification was cancelled.
    #[error("Notification has been cancelled")]
    AlreadyCancelled,

    /// The retry budget is used up.
    #[error("Notification exhausted its {max} delivery attempts")]
    RetriesExhausted {
        /// Retry ceiling
        max: u32,
    },
}
