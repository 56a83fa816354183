//! In-memory directory for testing.

use crate::error::{NotifyError, Result};
use crate::providers::{
    EventDetails, EventDirectory, GroupDirectory, GroupWithMembers, RsvpRepository,
    UserDirectory, UserProfile,
};
use gatherly_core::{EventId, EventRsvp, GroupId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory events, RSVPs, groups and users.
///
/// Implements all four lookup traits over shared state; clones see the same
/// data, so a test can seed one handle and give another to the services.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    events: Arc<Mutex<HashMap<EventId, EventDetails>>>,
    rsvps: Arc<Mutex<HashMap<EventId, Vec<EventRsvp>>>>,
    groups: Arc<Mutex<HashMap<GroupId, GroupWithMembers>>>,
    users: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

fn poisoned<T>(_: T) -> NotifyError {
    NotifyError::InternalError("directory lock poisoned".to_string())
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event (and its host as a user).
    ///
    /// # Errors
    ///
    /// Returns error if a lock is poisoned.
    pub fn insert_event(&self, details: EventDetails) -> Result<()> {
        self.insert_user(details.host.clone())?;
        self.events
            .lock()
            .map_err(poisoned)?
            .insert(details.event.id, details);
        Ok(())
    }

    /// Seed a user.
    ///
    /// # Errors
    ///
    /// Returns error if a lock is poisoned.
    pub fn insert_user(&self, profile: UserProfile) -> Result<()> {
        self.users
            .lock()
            .map_err(poisoned)?
            .insert(profile.user_id, profile);
        Ok(())
    }

    /// Seed a group.
    ///
    /// # Errors
    ///
    /// Returns error if a lock is poisoned.
    pub fn insert_group(&self, group: GroupWithMembers) -> Result<()> {
        self.groups
            .lock()
            .map_err(poisoned)?
            .insert(group.group.id, group);
        Ok(())
    }

    /// Seed an RSVP, replacing any existing one for the same user.
    ///
    /// # Errors
    ///
    /// Returns error if a lock is poisoned.
    pub fn insert_rsvp(&self, rsvp: EventRsvp) -> Result<()> {
        let mut rsvps = self.rsvps.lock().map_err(poisoned)?;
        let list = rsvps.entry(rsvp.event_id).or_default();
        match list.iter_mut().find(|r| r.user_id == rsvp.user_id) {
            Some(existing) => *existing = rsvp,
            None => list.push(rsvp),
        }
        Ok(())
    }

    /// Current RSVP of one user.
    ///
    /// # Errors
    ///
    /// Returns error if a lock is poisoned.
    pub fn rsvp_of(&self, event_id: EventId, user_id: UserId) -> Result<Option<EventRsvp>> {
        Ok(self
            .rsvps
            .lock()
            .map_err(poisoned)?
            .get(&event_id)
            .and_then(|list| list.iter().find(|r| r.user_id == user_id).cloned()))
    }
}

impl EventDirectory for InMemoryDirectory {
    async fn get_event_with_details(&self, event_id: EventId) -> Result<Option<EventDetails>> {
        Ok(self.events.lock().map_err(poisoned)?.get(&event_id).cloned())
    }
}

impl RsvpRepository for InMemoryDirectory {
    async fn get_event_rsvps(&self, event_id: EventId) -> Result<Vec<EventRsvp>> {
        Ok(self
            .rsvps
            .lock()
            .map_err(poisoned)?
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_rsvp(&self, rsvp: &EventRsvp) -> Result<()> {
        self.insert_rsvp(rsvp.clone())
    }

    async fn delete_rsvp(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let mut rsvps = self.rsvps.lock().map_err(poisoned)?;
        let Some(list) = rsvps.get_mut(&event_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|r| r.user_id != user_id);
        Ok(list.len() < before)
    }
}

impl GroupDirectory for InMemoryDirectory {
    async fn get_group_with_members(&self, group_id: GroupId) -> Result<Option<GroupWithMembers>> {
        Ok(self.groups.lock().map_err(poisoned)?.get(&group_id).cloned())
    }
}

impl UserDirectory for InMemoryDirectory {
    async fn get_user_with_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.users.lock().map_err(poisoned)?.get(&user_id).cloned())
    }
}
