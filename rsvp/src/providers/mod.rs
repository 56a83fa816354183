//! Collaborator interfaces.
//!
//! Every piece of I/O the services need is reached through one of these
//! traits. The services depend only on the traits; the worker wires in the
//! `PostgreSQL` and SMTP implementations, tests wire in [`crate::mocks`].
//!
//! ```text
//!  RsvpService ──► TriggerService ──► Dispatcher
//!      │                 │                │
//!      ▼                 ▼                ▼
//!  EventDirectory    GroupDirectory   TemplateRenderer
//!  RsvpRepository    UserDirectory    DeliveryChannel
//!  PermissionGate    NotificationStore
//! ```
//!
//! Lookups return `Ok(None)` for a missing entity; the service decides which
//! not-found error that becomes.

use gatherly_core::{Event, EventId, GroupId, GroupRole, UserId};
use serde::{Deserialize, Serialize};

pub mod channel;
pub mod console_channel;
pub mod directory;
pub mod permission;
pub mod smtp_channel;
pub mod store;
pub mod template;

pub use channel::DeliveryChannel;
pub use console_channel::ConsoleChannel;
pub use directory::{EventDirectory, GroupDirectory, RsvpRepository, UserDirectory};
pub use permission::{AllowAll, PermissionAction, PermissionGate};
pub use smtp_channel::SmtpChannel;
pub use store::{ExpectedState, NotificationStore};
pub use template::{DefaultTemplateRenderer, RenderedContent, TemplateRenderer};

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub user_id: UserId,

    /// Name shown to other users.
    pub display_name: String,

    /// Delivery address.
    pub email: String,
}

/// Where an event takes place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Venue name.
    pub name: String,

    /// Street address.
    pub address: Option<String>,
}

/// A group without its membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,

    /// Display name.
    pub name: String,
}

/// Membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Member.
    pub user_id: UserId,

    /// Role within the group.
    pub role: GroupRole,
}

/// A group together with every member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithMembers {
    /// The group.
    pub group: Group,

    /// Members, host included.
    pub members: Vec<GroupMember>,
}

/// An event with the related records needed for notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// The event.
    pub event: Event,

    /// Host profile.
    pub host: UserProfile,

    /// Venue, if one is set.
    pub venue: Option<Venue>,

    /// Owning group, if any.
    pub group: Option<Group>,
}

impl EventDetails {
    /// Event ID shortcut.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.event.id
    }
}
