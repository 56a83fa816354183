//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider
//! traits for use in unit and integration tests.

pub mod channel;
pub mod directory;
pub mod store;

pub use channel::{RecordingChannel, SentMessage};
pub use directory::InMemoryDirectory;
pub use store::InMemoryNotificationStore;

use crate::environment::NotificationEnvironment;
use crate::error::Result;
use crate::providers::{AllowAll, DefaultTemplateRenderer, PermissionAction, PermissionGate};
use gatherly_core::UserId;
use gatherly_core::environment::Clock;
use std::sync::Arc;

/// Gate that refuses everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionGate for DenyAll {
    async fn is_allowed(&self, _actor: UserId, _action: PermissionAction) -> Result<bool> {
        Ok(false)
    }
}

/// Environment wired entirely from in-memory mocks.
pub type MockEnvironment<P = AllowAll> = NotificationEnvironment<
    InMemoryDirectory,
    InMemoryDirectory,
    InMemoryDirectory,
    InMemoryDirectory,
    InMemoryNotificationStore,
    RecordingChannel,
    DefaultTemplateRenderer,
    P,
>;

/// Build a [`MockEnvironment`] whose four lookups share one directory.
#[must_use]
pub fn mock_environment<P>(
    directory: &InMemoryDirectory,
    store: &InMemoryNotificationStore,
    channel: &RecordingChannel,
    permissions: P,
    clock: Arc<dyn Clock>,
) -> MockEnvironment<P> {
    NotificationEnvironment::new(
        directory.clone(),
        directory.clone(),
        directory.clone(),
        directory.clone(),
        store.clone(),
        channel.clone(),
        DefaultTemplateRenderer::new("https://gatherly.test"),
        permissions,
        clock,
    )
}
