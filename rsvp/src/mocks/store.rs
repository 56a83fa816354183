//! In-memory notification store for testing.

use crate::error::{NotifyError, Result};
use crate::providers::{ExpectedState, NotificationStore};
use chrono::{DateTime, Utc};
use gatherly_core::{
    EventId, Notification, NotificationId, NotificationStatus, NotificationType, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory notification store.
///
/// Follows the same compare-and-set update guard as the `PostgreSQL` store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationStore {
    rows: Arc<Mutex<HashMap<NotificationId, Notification>>>,
}

impl InMemoryNotificationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn all(&self) -> Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self.lock()?.values().cloned().collect();
        rows.sort_by_key(|n| n.created_at);
        Ok(rows)
    }

    /// Overwrite a row unconditionally, bypassing the update guard.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn put(&self, notification: Notification) -> Result<()> {
        self.lock()?.insert(notification.id, notification);
        Ok(())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<NotificationId, Notification>>> {
        self.rows
            .lock()
            .map_err(|_| NotifyError::InternalError("store lock poisoned".to_string()))
    }

    fn select(
        &self,
        filter: impl Fn(&Notification) -> bool,
        sort_key: impl Fn(&Notification) -> DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self.lock()?.values().filter(|n| filter(n)).cloned().collect();
        rows.sort_by_key(|n| sort_key(n));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: &Notification) -> Result<()> {
        let mut rows = self.lock()?;
        if rows.contains_key(&notification.id) {
            return Err(NotifyError::StoreError(format!(
                "duplicate notification {}",
                notification.id
            )));
        }
        rows.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn create_many(&self, notifications: &[Notification]) -> Result<()> {
        let mut rows = self.lock()?;
        let mut ids = std::collections::HashSet::with_capacity(notifications.len());
        for notification in notifications {
            if rows.contains_key(&notification.id) || !ids.insert(notification.id) {
                return Err(NotifyError::StoreError(format!(
                    "duplicate notification {}",
                    notification.id
                )));
            }
        }
        for notification in notifications {
            rows.insert(notification.id, notification.clone());
        }
        Ok(())
    }

    async fn update(&self, notification: &Notification, expected: ExpectedState) -> Result<bool> {
        let mut rows = self.lock()?;
        match rows.get_mut(&notification.id) {
            Some(stored)
                if !stored.status.is_terminal() && ExpectedState::of(stored) == expected =>
            {
                *stored = notification.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn get_user_notifications(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .lock()?
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_pending_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        self.select(|n| n.is_ready_to_send(now), |n| n.scheduled_at, limit)
    }

    async fn get_failed_notifications(&self, limit: u32) -> Result<Vec<Notification>> {
        self.select(Notification::can_retry, |n| n.created_at, limit)
    }

    async fn get_pending_reminders(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<Notification>> {
        self.select(
            |n| {
                n.user_id == user_id
                    && n.notification_type == NotificationType::EventReminder
                    && n.payload.event_id() == Some(event_id)
                    && matches!(n.status, NotificationStatus::Pending | NotificationStatus::Failed)
            },
            |n| n.scheduled_at,
            u32::MAX,
        )
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.lock()?;
        let before = rows.len();
        rows.retain(|_, n| n.status == NotificationStatus::Pending || n.created_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
