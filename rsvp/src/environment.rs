//! Notification environment.
//!
//! This module defines the environment type for dependency injection into
//! the RSVP service, the trigger service and the dispatcher.

use crate::providers::{
    DeliveryChannel, EventDirectory, GroupDirectory, NotificationStore, PermissionGate,
    RsvpRepository, TemplateRenderer, UserDirectory,
};
use gatherly_core::environment::Clock;
use std::sync::Arc;

/// Bundle of collaborators the services are generic over.
///
/// Services take one `Env: Collaborators` parameter instead of one per
/// collaborator.
pub trait Collaborators: Send + Sync + 'static {
    /// Event lookup.
    type Events: EventDirectory;
    /// RSVP persistence.
    type Rsvps: RsvpRepository;
    /// Group lookup.
    type Groups: GroupDirectory;
    /// User lookup.
    type Users: UserDirectory;
    /// Notification persistence.
    type Store: NotificationStore;
    /// Outbound channel.
    type Channel: DeliveryChannel;
    /// Renderer.
    type Templates: TemplateRenderer;
    /// Authorization gate.
    type Permissions: PermissionGate;

    /// Event lookup.
    fn events(&self) -> &Self::Events;
    /// RSVP persistence.
    fn rsvps(&self) -> &Self::Rsvps;
    /// Group lookup.
    fn groups(&self) -> &Self::Groups;
    /// User lookup.
    fn users(&self) -> &Self::Users;
    /// Notification persistence.
    fn store(&self) -> &Self::Store;
    /// Outbound channel.
    fn channel(&self) -> &Self::Channel;
    /// Renderer.
    fn templates(&self) -> &Self::Templates;
    /// Authorization gate.
    fn permissions(&self) -> &Self::Permissions;
    /// Time source.
    fn clock(&self) -> &(dyn Clock + 'static);
}

/// Notification environment.
///
/// Contains all external dependencies needed by the services.
///
/// # Type Parameters
///
/// - `E`: Event directory
/// - `R`: RSVP repository
/// - `G`: Group directory
/// - `U`: User directory
/// - `S`: Notification store
/// - `C`: Delivery channel
/// - `T`: Template renderer
/// - `P`: Permission gate
#[derive(Clone)]
pub struct NotificationEnvironment<E, R, G, U, S, C, T, P> {
    /// Event directory.
    pub events: E,

    /// RSVP repository.
    pub rsvps: R,

    /// Group directory.
    pub groups: G,

    /// User directory.
    pub users: U,

    /// Notification store.
    pub store: S,

    /// Delivery channel.
    pub channel: C,

    /// Template renderer.
    pub templates: T,

    /// Permission gate.
    pub permissions: P,

    /// Clock.
    pub clock: Arc<dyn Clock>,
}

impl<E, R, G, U, S, C, T, P> NotificationEnvironment<E, R, G, U, S, C, T, P> {
    /// Create a new notification environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: E,
        rsvps: R,
        groups: G,
        users: U,
        store: S,
        channel: C,
        templates: T,
        permissions: P,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            rsvps,
            groups,
            users,
            store,
            channel,
            templates,
            permissions,
            clock,
        }
    }
}

impl<E, R, G, U, S, C, T, P> Collaborators for NotificationEnvironment<E, R, G, U, S, C, T, P>
where
    E: EventDirectory + 'static,
    R: RsvpRepository + 'static,
    G: GroupDirectory + 'static,
    U: UserDirectory + 'static,
    S: NotificationStore + 'static,
    C: DeliveryChannel + 'static,
    T: TemplateRenderer + 'static,
    P: PermissionGate + 'static,
{
    type Events = E;
    type Rsvps = R;
    type Groups = G;
    type Users = U;
    type Store = S;
    type Channel = C;
    type Templates = T;
    type Permissions = P;

    fn events(&self) -> &E {
        &self.events
    }

    fn rsvps(&self) -> &R {
        &self.rsvps
    }

    fn groups(&self) -> &G {
        &self.groups
    }

    fn users(&self) -> &U {
        &self.users
    }

    fn store(&self) -> &S {
        &self.store
    }

    fn channel(&self) -> &C {
        &self.channel
    }

    fn templates(&self) -> &T {
        &self.templates
    }

    fn permissions(&self) -> &P {
        &self.permissions
    }

    fn clock(&self) -> &(dyn Clock + 'static) {
        self.clock.as_ref()
    }
}
