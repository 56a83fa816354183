//! Read access to events, RSVPs, groups and users.

use super::{EventDetails, GroupWithMembers, UserProfile};
use crate::error::Result;
use gatherly_core::{EventId, EventRsvp, GroupId, UserId};

/// Event lookup.
pub trait EventDirectory: Send + Sync {
    /// Load an event with host, venue and group.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. A missing event is `Ok(None)`.
    fn get_event_with_details(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Option<EventDetails>>> + Send;
}

/// RSVP persistence.
///
/// The service serializes writes per event; implementations only need to
/// make each call atomic on its own.
pub trait RsvpRepository: Send + Sync {
    /// Every RSVP for an event, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_event_rsvps(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<EventRsvp>>> + Send;

    /// Insert or replace the RSVP keyed by `(event_id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn save_rsvp(&self, rsvp: &EventRsvp)
    -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove an RSVP. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn delete_rsvp(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Group lookup.
pub trait GroupDirectory: Send + Sync {
    /// Load a group with all members.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. A missing group is `Ok(None)`.
    fn get_group_with_members(
        &self,
        group_id: GroupId,
    ) -> impl std::future::Future<Output = Result<Option<GroupWithMembers>>> + Send;
}

/// User lookup.
pub trait UserDirectory: Send + Sync {
    /// Load a user's profile.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. A missing user is `Ok(None)`.
    fn get_user_with_profile(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>>> + Send;
}
