//! Delivery dispatcher.
//!
//! One sweep ([`Dispatcher::process_batch`]) loads due and retryable
//! notifications, renders and delivers them concurrently, and records every
//! result through the store. There is no backoff curve: a failed
//! notification is retried on the next sweep until it reaches
//! [`MAX_RETRIES`].
//!
//! # Guarantees
//!
//! - At most one in-flight attempt per notification ID within a dispatcher
//!   (and its clones).
//! - Every attempt is bounded by
//!   [`NotificationConfig::delivery_timeout`].
//! - Every attempt starts from the stored row, never from a caller's copy.
//! - A result that arrives after the row changed (cancelled, or recorded by
//!   another worker) is dropped, because [`NotificationStore::update`] is a
//!   compare-and-set on status and retry count.
//! - Delivery failures are recorded on the notification, never returned.

use crate::config::NotificationConfig;
use crate::environment::Collaborators;
use crate::error::{NotifyError, Result};
use crate::providers::{
    DeliveryChannel, ExpectedState, NotificationStore, TemplateRenderer, UserDirectory,
};
use futures::stream::{self, StreamExt};
use gatherly_core::{MAX_RETRIES, Notification, NotificationId};
use metrics::{counter, histogram};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivered and recorded as sent.
    Sent,
    /// Attempt failed and was recorded.
    Failed {
        /// Failed attempts so far
        retry_count: u32,
        /// No attempts left
        exhausted: bool,
    },
    /// No attempt was recorded.
    Skipped(SkipReason),
}

/// Why a notification was not attempted or its result not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another attempt for the same ID is running.
    InFlight,
    /// Not due, not retryable, already terminal, or deleted.
    NotDeliverable,
    /// The stored row changed during the attempt.
    Superseded,
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Notifications picked up.
    pub attempted: usize,
    /// Delivered.
    pub sent: usize,
    /// Failed and recorded.
    pub failed: usize,
    /// Of `failed`, those that used their last attempt.
    pub exhausted: usize,
    /// Not attempted or result dropped.
    pub skipped: usize,
    /// Could not be recorded (store errors).
    pub errors: usize,
}

impl BatchReport {
    fn record(&mut self, result: &Result<DeliveryOutcome>) {
        self.attempted += 1;
        match result {
            Ok(DeliveryOutcome::Sent) => self.sent += 1,
            Ok(DeliveryOutcome::Failed { exhausted, .. }) => {
                self.failed += 1;
                if *exhausted {
                    self.exhausted += 1;
                }
            }
            Ok(DeliveryOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.errors += 1,
        }
    }
}

/// Batch delivery of persisted notifications.
pub struct Dispatcher<Env: Collaborators> {
    env: Arc<Env>,
    config: Arc<NotificationConfig>,
    in_flight: Arc<Mutex<HashSet<NotificationId>>>,
}

impl<Env: Collaborators> Clone for Dispatcher<Env> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            config: Arc::clone(&self.config),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<Env: Collaborators> Dispatcher<Env> {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(env: Arc<Env>, config: Arc<NotificationConfig>) -> Self {
        Self {
            env,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Pending notifications whose scheduled time has come, earliest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    pub async fn fetch_due(&self, limit: u32) -> Result<Vec<Notification>> {
        let now = self.env.clock().now();
        self.env.store().get_pending_notifications(now, limit).await
    }

    /// Failed notifications with retries left, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    pub async fn fetch_retryable(&self, limit: u32) -> Result<Vec<Notification>> {
        let failed = self.env.store().get_failed_notifications(limit).await?;
        Ok(failed.into_iter().filter(Notification::can_retry).collect())
    }

    /// Run one delivery attempt and record its result.
    ///
    /// `notification` only names the row: the attempt works on a copy read
    /// from the store after the in-flight guard is taken, so a stale copy
    /// held by the caller can neither resend a delivered notification nor
    /// overwrite a newer retry count.
    ///
    /// # Errors
    ///
    /// Returns error only if the row cannot be read or the result cannot be
    /// persisted. A failed delivery is `Ok(DeliveryOutcome::Failed { .. })`.
    #[instrument(
        skip(self, notification),
        fields(notification_id = %notification.id, kind = %notification.notification_type)
    )]
    pub async fn deliver(&self, notification: Notification) -> Result<DeliveryOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, notification.id) else {
            debug!("Attempt already in flight");
            return Ok(DeliveryOutcome::Skipped(SkipReason::InFlight));
        };

        let Some(mut notification) = self.env.store().get(notification.id).await? else {
            debug!("Notification no longer stored");
            return Ok(DeliveryOutcome::Skipped(SkipReason::NotDeliverable));
        };
        if !notification.is_deliverable(self.env.clock().now()) {
            return Ok(DeliveryOutcome::Skipped(SkipReason::NotDeliverable));
        }
        let expected = ExpectedState::of(&notification);

        let started = Instant::now();
        let attempt = self.attempt(&notification).await;
        histogram!("notifications_delivery_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let outcome = match attempt {
            Ok(()) => {
                notification.mark_as_sent(self.env.clock().now())?;
                DeliveryOutcome::Sent
            }
            Err(err) => {
                notification.mark_as_failed(err.to_string())?;
                DeliveryOutcome::Failed {
                    retry_count: notification.retry_count,
                    exhausted: notification.retry_count >= MAX_RETRIES,
                }
            }
        };

        if !self.env.store().update(&notification, expected).await? {
            info!("Notification changed during delivery, result dropped");
            return Ok(DeliveryOutcome::Skipped(SkipReason::Superseded));
        }

        match outcome {
            DeliveryOutcome::Sent => {
                counter!("notifications_sent_total", "type" => notification.notification_type.as_str())
                    .increment(1);
                info!("Notification sent");
            }
            DeliveryOutcome::Failed {
                retry_count,
                exhausted,
            } => {
                counter!(
                    "notifications_failed_total",
                    "type" => notification.notification_type.as_str(),
                    "exhausted" => if exhausted { "true" } else { "false" }
                )
                .increment(1);
                warn!(
                    retry_count,
                    exhausted,
                    error = notification.last_error.as_deref().unwrap_or_default(),
                    "Notification delivery failed"
                );
            }
            DeliveryOutcome::Skipped(_) => {}
        }

        Ok(outcome)
    }

    /// Load a notification and attempt it.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::NotificationNotFound`] for an unknown ID, or a
    /// store error.
    pub async fn deliver_by_id(&self, id: NotificationId) -> Result<DeliveryOutcome> {
        let notification = self
            .env
            .store()
            .get(id)
            .await?
            .ok_or(NotifyError::NotificationNotFound(id))?;
        self.deliver(notification).await
    }

    /// One dispatcher sweep over due and retryable notifications.
    ///
    /// # Errors
    ///
    /// Returns error if either queue cannot be loaded. Per-notification
    /// failures are counted in the report instead.
    #[instrument(skip(self))]
    pub async fn process_batch(&self) -> Result<BatchReport> {
        let limit = self.config.batch_size;
        let mut batch = self.fetch_due(limit).await?;
        let retryable = self.fetch_retryable(limit).await?;

        let mut seen: HashSet<NotificationId> = batch.iter().map(|n| n.id).collect();
        batch.extend(retryable.into_iter().filter(|n| seen.insert(n.id)));

        if batch.is_empty() {
            debug!("Nothing to deliver");
            return Ok(BatchReport::default());
        }

        let results: Vec<Result<DeliveryOutcome>> = stream::iter(batch)
            .map(|notification| self.deliver(notification))
            .buffer_unordered(self.config.max_concurrent_deliveries.max(1))
            .collect()
            .await;

        let mut report = BatchReport::default();
        for result in &results {
            if let Err(err) = result {
                warn!(error = %err, "Could not record delivery result");
            }
            report.record(result);
        }

        info!(
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            exhausted = report.exhausted,
            skipped = report.skipped,
            errors = report.errors,
            "Dispatcher sweep complete"
        );
        Ok(report)
    }

    /// Delete finished notifications older than the retention age.
    ///
    /// # Errors
    ///
    /// Returns error if the store delete fails.
    pub async fn sweep_retention(&self) -> Result<u64> {
        let cutoff = self.env.clock().now() - self.config.retention;
        let deleted = self.env.store().delete_older_than(cutoff).await?;
        if deleted > 0 {
            info!(deleted, %cutoff, "Retention sweep removed notifications");
        }
        Ok(deleted)
    }

    async fn attempt(&self, notification: &Notification) -> Result<()> {
        let timeout = self.config.delivery_timeout;
        let send = async {
            let recipient = self
                .env
                .users()
                .get_user_with_profile(notification.user_id)
                .await?
                .ok_or(NotifyError::UserNotFound(notification.user_id))?;
            let content = self
                .env
                .templates()
                .render(notification.notification_type, &notification.payload)?;

            self.env
                .channel()
                .send_content(&[recipient.email], &content.subject, &content.body)
                .await
        };

        tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| NotifyError::DeliveryTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

/// Marks a notification ID as in flight until dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<NotificationId>>>,
    id: NotificationId,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<NotificationId>>>, id: NotificationId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        inserted.then(|| Self {
            set: Arc::clone(set),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let set = Arc::new(Mutex::new(HashSet::new()));
        let id = NotificationId::new();

        let guard = InFlightGuard::acquire(&set, id);
        assert!(guard.is_some());
        assert!(InFlightGuard::acquire(&set, id).is_none());

        drop(guard);
        assert!(InFlightGuard::acquire(&set, id).is_some());
    }

    #[test]
    fn test_report_tally() {
        let mut report = BatchReport::default();
        report.record(&Ok(DeliveryOutcome::Sent));
        report.record(&Ok(DeliveryOutcome::Failed {
            retry_count: 5,
            exhausted: true,
        }));
        report.record(&Ok(DeliveryOutcome::Skipped(SkipReason::InFlight)));
        report.record(&Err(NotifyError::StoreError("down".into())));

        assert_eq!(
            report,
            BatchReport {
                attempted: 4,
                sent: 1,
                failed: 1,
                exhausted: 1,
                skipped: 1,
                errors: 1,
            }
        );
    }
}
