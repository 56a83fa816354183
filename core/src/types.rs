//! Domain types for the RSVP engine.
//!
//! Identifiers, events, RSVPs and group roles. All of these are plain data;
//! the rules that operate on them live in [`crate::capacity`] and
//! [`crate::validation`].

use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Defines a UUID-backed identifier newtype.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use define_id;

define_id!(
    /// Unique identifier for an event
    EventId
);
define_id!(
    /// Unique identifier for a user
    UserId
);
define_id!(
    /// Unique identifier for a group
    GroupId
);

// ============================================================================
// RSVP status
// ============================================================================

/// Status of a user's RSVP to an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    /// Seated; counts against capacity.
    Going,
    /// Following the event without taking a seat.
    Interested,
    /// Explicitly not attending.
    Declined,
    /// Wanted a seat while the event was full.
    Waitlisted,
}

impl RsvpStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Interested => "interested",
            Self::Declined => "declined",
            Self::Waitlisted => "waitlisted",
        }
    }

    /// Returns `true` if this status occupies a seat.
    #[must_use]
    pub const fn is_seated(&self) -> bool {
        matches!(self, Self::Going)
    }

    /// Returns `true` if users with this status hear about event changes.
    #[must_use]
    pub const fn follows_updates(&self) -> bool {
        matches!(self, Self::Going | Self::Waitlisted)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "going" => Ok(Self::Going),
            "interested" => Ok(Self::Interested),
            "declined" => Ok(Self::Declined),
            "waitlisted" => Ok(Self::Waitlisted),
            other => Err(ValidationError::InvalidRsvpStatus(other.to_string())),
        }
    }
}

// ============================================================================
// RSVP
// ============================================================================

/// A user's RSVP to an event.
///
/// Keyed by `(event_id, user_id)`; the engine guarantees at most one record
/// per pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRsvp {
    /// Event this RSVP belongs to
    pub event_id: EventId,
    /// User who responded
    pub user_id: UserId,
    /// Current status
    pub status: RsvpStatus,
    /// When the RSVP was first created (waitlist position)
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl EventRsvp {
    /// Create a fresh RSVP record.
    #[must_use]
    pub const fn new(
        event_id: EventId,
        user_id: UserId,
        status: RsvpStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            user_id,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with a new status and `updated_at`.
    ///
    /// `created_at` is kept, so a waitlisted user keeps their queue position.
    #[must_use]
    pub fn with_status(&self, status: RsvpStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self.clone()
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// Who can see an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed publicly
    #[default]
    Public,
    /// Visible to members of the owning group
    Group,
    /// Invite only
    Private,
}

impl Visibility {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Group => "group",
            Self::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "group" => Ok(Self::Group),
            "private" => Ok(Self::Private),
            other => Err(ValidationError::InvalidVisibility(other.to_string())),
        }
    }
}

/// Venue location in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90..=90
    pub latitude: f64,
    /// Longitude, -180..=180
    pub longitude: f64,
}

/// A scheduled event owned by its host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Hosting user
    pub host_id: UserId,
    /// Owning group, if the event was created inside one
    pub group_id: Option<GroupId>,
    /// Display title
    pub title: String,
    /// Venue coordinates
    pub coordinates: Option<Coordinates>,
    /// Seat limit; `None` means unlimited
    pub capacity: Option<u32>,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// End time
    pub ends_at: DateTime<Utc>,
    /// Visibility
    pub visibility: Visibility,
}

impl Event {
    /// Start building an event.
    ///
    /// The event defaults to unlimited capacity, public visibility and a
    /// two hour duration.
    #[must_use]
    pub fn builder(
        host_id: UserId,
        title: impl Into<String>,
        starts_at: DateTime<Utc>,
    ) -> EventBuilder {
        EventBuilder {
            event: Self {
                id: EventId::new(),
                host_id,
                group_id: None,
                title: title.into(),
                coordinates: None,
                capacity: None,
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                visibility: Visibility::Public,
            },
        }
    }

    /// Returns `true` if the event has no seat limit.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.capacity.is_none()
    }
}

/// Builder for [`Event`].
#[derive(Clone, Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Use a specific id.
    #[must_use]
    pub const fn id(mut self, id: EventId) -> Self {
        self.event.id = id;
        self
    }

    /// Attach the event to a group.
    #[must_use]
    pub const fn group(mut self, group_id: GroupId) -> Self {
        self.event.group_id = Some(group_id);
        self
    }

    /// Limit the number of seats.
    #[must_use]
    pub const fn capacity(mut self, capacity: u32) -> Self {
        self.event.capacity = Some(capacity);
        self
    }

    /// Set the end time.
    #[must_use]
    pub const fn ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.event.ends_at = ends_at;
        self
    }

    /// Set venue coordinates.
    #[must_use]
    pub const fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.event.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    /// Set visibility.
    #[must_use]
    pub const fn visibility(mut self, visibility: Visibility) -> Self {
        self.event.visibility = visibility;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}

// ============================================================================
// Groups
// ============================================================================

/// Role a member holds within a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    /// Group creator
    Owner,
    /// Can manage members and events
    Admin,
    /// Regular member
    #[default]
    Member,
}

impl GroupRole {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(ValidationError::InvalidGroupRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsvp_status_parse() {
        assert_eq!("going".parse::<RsvpStatus>(), Ok(RsvpStatus::Going));
        assert_eq!(" Declined ".parse::<RsvpStatus>(), Ok(RsvpStatus::Declined));
        assert!(matches!(
            "maybe".parse::<RsvpStatus>(),
            Err(ValidationError::InvalidRsvpStatus(s)) if s == "maybe"
        ));
    }

    #[test]
    fn test_rsvp_status_serde_is_lowercase() {
        let json = serde_json::to_string(&RsvpStatus::Waitlisted).unwrap();
        assert_eq!(json, "\"waitlisted\"");
    }

    #[test]
    fn test_with_status_keeps_created_at() {
        let created = Utc::now();
        let rsvp = EventRsvp::new(EventId::new(), UserId::new(), RsvpStatus::Waitlisted, created);
        let later = created + Duration::minutes(5);

        let updated = rsvp.with_status(RsvpStatus::Going, later);

        assert_eq!(updated.created_at, created);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.status, RsvpStatus::Going);
    }

    #[test]
    fn test_event_builder_defaults() {
        let start = Utc::now();
        let event = Event::builder(UserId::new(), "Picnic", start).build();

        assert!(event.is_unlimited());
        assert_eq!(event.ends_at - event.starts_at, Duration::hours(2));
        assert_eq!(event.visibility, Visibility::Public);
    }

    #[test]
    fn test_group_role_round_trip() {
        for role in [GroupRole::Owner, GroupRole::Admin, GroupRole::Member] {
            assert_eq!(role.as_str().parse::<GroupRole>(), Ok(role));
        }
    }
}
