//! `PostgreSQL` notification store.

use crate::{corrupt_row, db_error};
use chrono::{DateTime, Utc};
use gatherly_core::{
    EventId, MAX_RETRIES, Notification, NotificationId, NotificationPayload, NotificationStatus,
    NotificationType, UserId,
};
use gatherly_rsvp::Result;
use gatherly_rsvp::providers::{ExpectedState, NotificationStore};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// Notification store backed by the `notifications` table.
///
/// Updates are a compare-and-set on `status` and `retry_count`, restricted
/// to `pending` and `failed` rows, so a sent or cancelled row is never
/// overwritten and a stale copy never rolls back a newer retry count.
#[derive(Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(row: &PgRow) -> Result<Notification> {
    let notification_type: NotificationType = row
        .try_get::<String, _>("type")
        .map_err(corrupt_row)?
        .parse()
        .map_err(corrupt_row)?;
    let status: NotificationStatus = row
        .try_get::<String, _>("status")
        .map_err(corrupt_row)?
        .parse()
        .map_err(corrupt_row)?;
    let payload = NotificationPayload::from_json(
        notification_type,
        row.try_get("payload").map_err(corrupt_row)?,
    )
    .map_err(corrupt_row)?;
    let retry_count = u32::try_from(row.try_get::<i32, _>("retry_count").map_err(corrupt_row)?)
        .map_err(corrupt_row)?;

    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get("id").map_err(corrupt_row)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt_row)?),
        notification_type,
        payload,
        status,
        scheduled_at: row.try_get("scheduled_at").map_err(corrupt_row)?,
        sent_at: row.try_get("sent_at").map_err(corrupt_row)?,
        retry_count,
        last_error: row.try_get("last_error").map_err(corrupt_row)?,
        created_at: row.try_get("created_at").map_err(corrupt_row)?,
    })
}

fn decode_all(rows: &[PgRow]) -> Result<Vec<Notification>> {
    rows.iter().map(decode).collect()
}

fn retry_count(notification: &Notification) -> Result<i32> {
    i32::try_from(notification.retry_count).map_err(corrupt_row)
}

const INSERT: &str = r"
    INSERT INTO notifications (
        id, user_id, type, payload, status, scheduled_at, sent_at,
        retry_count, last_error, created_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
";

impl PostgresNotificationStore {
    async fn insert<'e, E>(executor: E, notification: &Notification) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let payload = notification.payload.to_json()?;

        sqlx::query(INSERT)
            .bind(notification.id.as_uuid())
            .bind(notification.user_id.as_uuid())
            .bind(notification.notification_type.as_str())
            .bind(payload)
            .bind(notification.status.as_str())
            .bind(notification.scheduled_at)
            .bind(notification.sent_at)
            .bind(retry_count(notification)?)
            .bind(notification.last_error.as_deref())
            .bind(notification.created_at)
            .execute(executor)
            .await
            .map_err(db_error("Failed to create notification"))?;
        Ok(())
    }
}

impl NotificationStore for PostgresNotificationStore {
    async fn create(&self, notification: &Notification) -> Result<()> {
        Self::insert(&self.pool, notification).await?;

        tracing::debug!(
            notification_id = %notification.id,
            kind = %notification.notification_type,
            "Notification stored"
        );
        Ok(())
    }

    async fn create_many(&self, notifications: &[Notification]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        for notification in notifications {
            Self::insert(&mut *tx, notification).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit notifications"))?;

        tracing::debug!(count = notifications.len(), "Notifications stored");
        Ok(())
    }

    async fn update(&self, notification: &Notification, expected: ExpectedState) -> Result<bool> {
        let payload = notification.payload.to_json()?;
        let expected_retry_count = i32::try_from(expected.retry_count).map_err(corrupt_row)?;

        let result = sqlx::query(
            r"
            UPDATE notifications
            SET payload = $2, status = $3, scheduled_at = $4, sent_at = $5,
                retry_count = $6, last_error = $7
            WHERE id = $1
              AND status IN ('pending', 'failed')
              AND status = $8
              AND retry_count = $9
            ",
        )
        .bind(notification.id.as_uuid())
        .bind(payload)
        .bind(notification.status.as_str())
        .bind(notification.scheduled_at)
        .bind(notification.sent_at)
        .bind(retry_count(notification)?)
        .bind(notification.last_error.as_deref())
        .bind(expected.status.as_str())
        .bind(expected_retry_count)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update notification"))?;

        let applied = result.rows_affected() == 1;
        if !applied {
            tracing::debug!(
                notification_id = %notification.id,
                "Update skipped, row missing, terminal or changed"
            );
        }
        Ok(applied)
    }

    async fn get(&self, id: NotificationId) -> Result<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load notification"))?;
        row.as_ref().map(decode).transpose()
    }

    async fn get_user_notifications(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load user notifications"))?;
        decode_all(&rows)
    }

    async fn get_pending_notifications(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM notifications
            WHERE status = 'pending' AND scheduled_at <= $1
            ORDER BY scheduled_at ASC
            LIMIT $2
            ",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load pending notifications"))?;
        decode_all(&rows)
    }

    async fn get_failed_notifications(&self, limit: u32) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM notifications
            WHERE status = 'failed' AND retry_count < $1
            ORDER BY created_at ASC
            LIMIT $2
            ",
        )
        .bind(i64::from(MAX_RETRIES))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load failed notifications"))?;
        decode_all(&rows)
    }

    async fn get_pending_reminders(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM notifications
            WHERE user_id = $1
              AND type = $2
              AND payload->>'event_id' = $3
              AND status IN ('pending', 'failed')
            ORDER BY scheduled_at ASC
            ",
        )
        .bind(user_id.as_uuid())
        .bind(NotificationType::EventReminder.as_str())
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load pending reminders"))?;
        decode_all(&rows)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE status <> 'pending' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to delete old notifications"))?;

        let deleted = result.rows_affected();
        metrics::counter!("notifications_deleted_total").increment(deleted);
        Ok(deleted)
    }
}
