//! Notification record and lifecycle.
//!
//! A notification is created `pending`, becomes `sent` on delivery, `failed`
//! on a delivery error, and may be `cancelled` before it is sent.
//!
//! ```text
//! pending ──► sent
//!    │         ▲
//!    ▼         │
//! failed ──────┘   (each failed attempt increments retry_count)
//!    │
//!    └─ retry_count == MAX_RETRIES: stays failed, no more attempts
//!
//! pending | failed ──► cancelled
//! ```
//!
//! Failed notifications past the retry ceiling keep the `failed` status so
//! they remain queryable; [`Notification::can_retry`] is what excludes them
//! from delivery.

use crate::error::{LifecycleError, ValidationError};
use crate::types::{EventId, GroupId, GroupRole, RsvpStatus, UserId, define_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum number of failed delivery attempts.
pub const MAX_RETRIES: u32 = 5;

define_id!(
    /// Unique identifier for a notification
    NotificationId
);

// ============================================================================
// Type & status
// ============================================================================

/// Kind of notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// RSVP status confirmed (including waitlist promotions)
    RsvpConfirmation,
    /// Event details changed
    EventUpdate,
    /// Event starts soon
    EventReminder,
    /// Invited to join a group
    GroupInvite,
    /// New event in one of the user's groups
    GroupEvent,
}

impl NotificationType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RsvpConfirmation => "rsvp_confirmation",
            Self::EventUpdate => "event_update",
            Self::EventReminder => "event_reminder",
            Self::GroupInvite => "group_invite",
            Self::GroupEvent => "group_event",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rsvp_confirmation" => Ok(Self::RsvpConfirmation),
            "event_update" => Ok(Self::EventUpdate),
            "event_reminder" => Ok(Self::EventReminder),
            "group_invite" => Ok(Self::GroupInvite),
            "group_event" => Ok(Self::GroupEvent),
            other => Err(ValidationError::InvalidNotificationType(other.to_string())),
        }
    }
}

/// Delivery status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Waiting for its scheduled time
    Pending,
    /// Delivered
    Sent,
    /// Last attempt failed
    Failed,
    /// Suppressed before delivery
    Cancelled,
}

impl NotificationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for states that never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ValidationError::InvalidNotificationStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Fields for [`NotificationType::RsvpConfirmation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpConfirmationPayload {
    /// Event responded to
    pub event_id: EventId,
    /// Event title at the time of the RSVP
    pub event_title: String,
    /// Confirmed status
    pub status: RsvpStatus,
    /// Event start
    pub starts_at: DateTime<Utc>,
    /// The seat came from the waitlist
    #[serde(default)]
    pub promoted: bool,
}

/// Fields for [`NotificationType::EventUpdate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdatePayload {
    /// Changed event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Host-supplied description of the change, verbatim
    pub change_message: String,
}

/// Fields for [`NotificationType::EventReminder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReminderPayload {
    /// Upcoming event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Event start
    pub starts_at: DateTime<Utc>,
    /// Lead time of this reminder
    pub minutes_before: i64,
}

/// Fields for [`NotificationType::GroupInvite`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInvitePayload {
    /// Group the user is invited to
    pub group_id: GroupId,
    /// Group name
    pub group_name: String,
    /// User who sent the invite
    pub inviter_id: UserId,
    /// Inviter display name
    pub inviter_name: String,
    /// Role granted on acceptance
    pub role: GroupRole,
    /// Token the invitee presents to accept
    pub invite_token: String,
}

/// Fields for [`NotificationType::GroupEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEventPayload {
    /// New event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Owning group
    pub group_id: GroupId,
    /// Group name
    pub group_name: String,
    /// Host display name
    pub host_name: String,
    /// Event start
    pub starts_at: DateTime<Utc>,
}

/// Typed notification payload, one variant per [`NotificationType`].
///
/// At the storage boundary the payload is a plain JSON object holding the
/// variant's fields; the type column tells which variant to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// RSVP confirmation
    RsvpConfirmation(RsvpConfirmationPayload),
    /// Event update
    EventUpdate(EventUpdatePayload),
    /// Event reminder
    EventReminder(EventReminderPayload),
    /// Group invite
    GroupInvite(GroupInvitePayload),
    /// Group event
    GroupEvent(GroupEventPayload),
}

impl NotificationPayload {
    /// The notification type this payload belongs to.
    #[must_use]
    pub const fn notification_type(&self) -> NotificationType {
        match self {
            Self::RsvpConfirmation(_) => NotificationType::RsvpConfirmation,
            Self::EventUpdate(_) => NotificationType::EventUpdate,
            Self::EventReminder(_) => NotificationType::EventReminder,
            Self::GroupInvite(_) => NotificationType::GroupInvite,
            Self::GroupEvent(_) => NotificationType::GroupEvent,
        }
    }

    /// The event this payload refers to, if any.
    #[must_use]
    pub const fn event_id(&self) -> Option<EventId> {
        match self {
            Self::RsvpConfirmation(p) => Some(p.event_id),
            Self::EventUpdate(p) => Some(p.event_id),
            Self::EventReminder(p) => Some(p.event_id),
            Self::GroupEvent(p) => Some(p.event_id),
            Self::GroupInvite(_) => None,
        }
    }

    /// Encode the variant's fields as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedPayload`] if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value, ValidationError> {
        let value = match self {
            Self::RsvpConfirmation(p) => serde_json::to_value(p),
            Self::EventUpdate(p) => serde_json::to_value(p),
            Self::EventReminder(p) => serde_json::to_value(p),
            Self::GroupInvite(p) => serde_json::to_value(p),
            Self::GroupEvent(p) => serde_json::to_value(p),
        };
        value.map_err(|e| ValidationError::MalformedPayload(e.to_string()))
    }

    /// Decode a JSON object for the given notification type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedPayload`] if the object does not
    /// match the type's fields.
    pub fn from_json(
        notification_type: NotificationType,
        value: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        let decoded = match notification_type {
            NotificationType::RsvpConfirmation => {
                serde_json::from_value(value).map(Self::RsvpConfirmation)
            }
            NotificationType::EventUpdate => serde_json::from_value(value).map(Self::EventUpdate),
            NotificationType::EventReminder => {
                serde_json::from_value(value).map(Self::EventReminder)
            }
            NotificationType::GroupInvite => serde_json::from_value(value).map(Self::GroupInvite),
            NotificationType::GroupEvent => serde_json::from_value(value).map(Self::GroupEvent),
        };
        decoded.map_err(|e| {
            ValidationError::MalformedPayload(format!("{notification_type}: {e}"))
        })
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A durable outbound notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier
    pub id: NotificationId,
    /// Recipient
    pub user_id: UserId,
    /// Kind, always equal to `payload.notification_type()`
    pub notification_type: NotificationType,
    /// Rendering data
    pub payload: NotificationPayload,
    /// Delivery status
    pub status: NotificationStatus,
    /// Earliest delivery time
    pub scheduled_at: DateTime<Utc>,
    /// When delivery succeeded
    pub sent_at: Option<DateTime<Utc>>,
    /// Failed delivery attempts so far
    pub retry_count: u32,
    /// Message of the most recent failure
    pub last_error: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification deliverable right away.
    #[must_use]
    pub fn new(user_id: UserId, payload: NotificationPayload, now: DateTime<Utc>) -> Self {
        Self::scheduled(user_id, payload, now, now)
    }

    /// Create a notification deliverable from `scheduled_at` on.
    #[must_use]
    pub fn scheduled(
        user_id: UserId,
        payload: NotificationPayload,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::from_uuid(Uuid::new_v4()),
            user_id,
            notification_type: payload.notification_type(),
            payload,
            status: NotificationStatus::Pending,
            scheduled_at,
            sent_at: None,
            retry_count: 0,
            last_error: None,
            created_at: now,
        }
    }

    /// Pending and due.
    #[must_use]
    pub fn is_ready_to_send(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending && now >= self.scheduled_at
    }

    /// Failed with retry budget left.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        matches!(self.status, NotificationStatus::Failed) && self.retry_count < MAX_RETRIES
    }

    /// Failed with no retry budget left.
    #[must_use]
    pub const fn is_permanently_failed(&self) -> bool {
        matches!(self.status, NotificationStatus::Failed) && self.retry_count >= MAX_RETRIES
    }

    /// Eligible for a delivery attempt now.
    #[must_use]
    pub fn is_deliverable(&self, now: DateTime<Utc>) -> bool {
        self.is_ready_to_send(now) || self.can_retry()
    }

    /// Record a successful delivery.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadySent`] or
    /// [`LifecycleError::AlreadyCancelled`] for terminal notifications.
    pub fn mark_as_sent(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.ensure_not_terminal()?;
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(now);
        Ok(())
    }

    /// Record a failed delivery attempt.
    ///
    /// Used for the first failure and for every failed retry alike, so
    /// `retry_count` is the number of failed attempts.
    ///
    /// # Errors
    ///
    /// Returns an error for terminal notifications, or
    /// [`LifecycleError::RetriesExhausted`] once the ceiling is reached.
    pub fn mark_as_failed(&mut self, message: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_not_terminal()?;
        if self.retry_count >= MAX_RETRIES {
            return Err(LifecycleError::RetriesExhausted { max: MAX_RETRIES });
        }
        self.status = NotificationStatus::Failed;
        self.retry_count += 1;
        self.last_error = Some(message.into());
        Ok(())
    }

    /// Suppress delivery.
    ///
    /// Cancelling an already cancelled notification is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadySent`] if the notification was sent.
    pub fn mark_as_cancelled(&mut self) -> Result<(), LifecycleError> {
        match self.status {
            NotificationStatus::Sent => Err(LifecycleError::AlreadySent),
            NotificationStatus::Cancelled => Ok(()),
            NotificationStatus::Pending | NotificationStatus::Failed => {
                self.status = NotificationStatus::Cancelled;
                Ok(())
            }
        }
    }

    const fn ensure_not_terminal(&self) -> Result<(), LifecycleError> {
        match self.status {
            NotificationStatus::Sent => Err(LifecycleError::AlreadySent),
            NotificationStatus::Cancelled => Err(LifecycleError::AlreadyCancelled),
            NotificationStatus::Pending | NotificationStatus::Failed => Ok(()),
        }
    }
}
