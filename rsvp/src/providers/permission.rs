//! Authorization gate.
//!
//! The permission matrix lives elsewhere; the services only ask yes or no.

use crate::error::Result;
use gatherly_core::{EventId, UserId};
use std::fmt;

/// Actions the services check before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionAction {
    /// Create, change or withdraw an RSVP.
    RsvpToEvent(EventId),
    /// Read an event's capacity summary.
    ViewEvent(EventId),
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsvpToEvent(id) => write!(f, "rsvp to event {id}"),
            Self::ViewEvent(id) => write!(f, "view event {id}"),
        }
    }
}

/// Yes/no authorization check.
pub trait PermissionGate: Send + Sync {
    /// Whether `actor` may perform `action`.
    ///
    /// # Errors
    ///
    /// Returns error if the decision cannot be made.
    fn is_allowed(
        &self,
        actor: UserId,
        action: PermissionAction,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

/// Gate that allows everything.
///
/// For deployments where authorization happens before the service is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    async fn is_allowed(&self, _actor: UserId, _action: PermissionAction) -> Result<bool> {
        Ok(true)
    }
}
