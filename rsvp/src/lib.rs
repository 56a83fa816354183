//! # Gatherly RSVP & Notifications
//!
//! The service layer around the pure engine in `gatherly-core`.
//!
//! - [`RsvpService`]: join, change and withdraw RSVPs with per-event
//!   serialization and automatic waitlist promotion
//! - [`TriggerService`]: turns RSVPs, event changes and group activity into
//!   durable notifications
//! - [`Dispatcher`]: delivers due notifications in batches, retrying failures
//!   up to the retry ceiling
//!
//! All I/O goes through the traits in [`providers`], bundled by an
//! [`environment::Collaborators`] implementation.
//!
//! ## Example
//!
//! ```
//! use gatherly_rsvp::mocks::{self, InMemoryDirectory, InMemoryNotificationStore, RecordingChannel};
//! use gatherly_rsvp::providers::AllowAll;
//! use gatherly_rsvp::{Dispatcher, NotificationConfig, TriggerService};
//! use gatherly_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! let directory = InMemoryDirectory::new();
//! let store = InMemoryNotificationStore::new();
//! let channel = RecordingChannel::new();
//! let env = Arc::new(mocks::mock_environment(
//!     &directory,
//!     &store,
//!     &channel,
//!     AllowAll,
//!     Arc::new(SystemClock),
//! ));
//!
//! let config = Arc::new(NotificationConfig::default());
//! let dispatcher = Dispatcher::new(Arc::clone(&env), Arc::clone(&config));
//! let _triggers = TriggerService::new(env, config, dispatcher);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod config;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod providers;
pub mod service;
pub mod triggers;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use config::NotificationConfig;
pub use dispatcher::{BatchReport, DeliveryOutcome, Dispatcher, SkipReason};
pub use environment::{Collaborators, NotificationEnvironment};
pub use error::{NotifyError, Result};
pub use service::RsvpService;
pub use triggers::TriggerService;
