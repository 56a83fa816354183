//! Notification persistence trait.

use crate::error::Result;
use chrono::{DateTime, Utc};
use gatherly_core::{EventId, Notification, NotificationId, NotificationStatus, UserId};

/// The state a stored row must still be in for an update to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    /// Stored status, `pending` or `failed`
    pub status: NotificationStatus,
    /// Stored retry count
    pub retry_count: u32,
}

impl ExpectedState {
    /// The state `notification` was read in.
    #[must_use]
    pub const fn of(notification: &Notification) -> Self {
        Self {
            status: notification.status,
            retry_count: notification.retry_count,
        }
    }
}

/// Durable notification storage.
///
/// # Update guard
///
/// [`update`](NotificationStore::update) is a compare-and-set: it applies
/// only when the stored row is still non-terminal and matches the
/// [`ExpectedState`] the caller read it in. A result computed from a stale
/// copy (the row was cancelled, sent, or retried by someone else in the
/// meantime) is dropped instead of overwriting the newer state.
pub trait NotificationStore: Send + Sync {
    /// Persist a new notification.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails or the ID already exists.
    fn create(
        &self,
        notification: &Notification,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Persist several notifications atomically: all of them or none.
    ///
    /// # Errors
    ///
    /// Returns error if any write fails or an ID already exists.
    fn create_many(
        &self,
        notifications: &[Notification],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Overwrite a notification that is still in the `expected` state.
    ///
    /// Returns `false` if the stored row was missing, terminal, or has moved
    /// on from `expected`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn update(
        &self,
        notification: &Notification,
        expected: ExpectedState,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Load one notification.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get(
        &self,
        id: NotificationId,
    ) -> impl std::future::Future<Output = Result<Option<Notification>>> + Send;

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_user_notifications(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Notification>>> + Send;

    /// Pending notifications with `scheduled_at <= now`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_pending_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Notification>>> + Send;

    /// Failed notifications below the retry ceiling, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_failed_notifications(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Notification>>> + Send;

    /// Undelivered reminders for one user and event.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_pending_reminders(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Notification>>> + Send;

    /// Delete non-pending notifications created before `cutoff`.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
