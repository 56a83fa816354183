//! Notification configuration.
//!
//! Values are provided by the application and passed to the services at
//! construction time.

use chrono::Duration;
use std::env;

/// Tuning for triggers and the delivery dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Lead times before an event's start at which reminders are scheduled.
    ///
    /// Default: 24 hours and 1 hour
    pub reminder_offsets: Vec<Duration>,

    /// Maximum notifications fetched per queue in one sweep.
    ///
    /// Default: 100
    pub batch_size: u32,

    /// Budget for a single delivery attempt.
    ///
    /// Default: 10 seconds
    pub delivery_timeout: std::time::Duration,

    /// Deliveries running at once within a sweep.
    ///
    /// Default: 8
    pub max_concurrent_deliveries: usize,

    /// Age after which finished notifications are deleted.
    ///
    /// Default: 90 days
    pub retention: Duration,

    /// Application URL used for links in rendered messages.
    pub base_url: String,
}

impl NotificationConfig {
    /// Create a configuration with default tuning.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Replace the reminder schedule.
    #[must_use]
    pub fn with_reminder_offsets(mut self, offsets: Vec<Duration>) -> Self {
        self.reminder_offsets = offsets;
        self
    }

    /// Set the per-queue batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the per-attempt delivery timeout.
    #[must_use]
    pub const fn with_delivery_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set delivery concurrency. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_concurrent_deliveries(mut self, max: usize) -> Self {
        self.max_concurrent_deliveries = max.max(1);
        self
    }

    /// Set the retention age.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `APP_BASE_URL` | link base |
    /// | `REMINDER_OFFSETS_MINUTES` | comma-separated lead times, e.g. `1440,60` |
    /// | `NOTIFICATION_BATCH_SIZE` | per-queue batch size |
    /// | `DELIVERY_TIMEOUT_SECS` | per-attempt timeout |
    /// | `DELIVERY_CONCURRENCY` | concurrent deliveries |
    /// | `NOTIFICATION_RETENTION_DAYS` | retention age |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reminder_offsets: env::var("REMINDER_OFFSETS_MINUTES")
                .ok()
                .and_then(|s| parse_offsets(&s))
                .unwrap_or(defaults.reminder_offsets),
            batch_size: env::var("NOTIFICATION_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
            delivery_timeout: env::var("DELIVERY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.delivery_timeout, std::time::Duration::from_secs),
            max_concurrent_deliveries: env::var("DELIVERY_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .map_or(defaults.max_concurrent_deliveries, |n| n.max(1)),
            retention: env::var("NOTIFICATION_RETENTION_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.retention, Duration::days),
            base_url: env::var("APP_BASE_URL").unwrap_or(defaults.base_url),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            reminder_offsets: vec![Duration::hours(24), Duration::hours(1)],
            batch_size: 100,
            delivery_timeout: std::time::Duration::from_secs(10),
            max_concurrent_deliveries: 8,
            retention: Duration::days(90),
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Parse `"1440,60"` into lead times. Any bad entry rejects the whole list.
fn parse_offsets(raw: &str) -> Option<Vec<Duration>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().ok().filter(|m| *m > 0).map(Duration::minutes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NotificationConfig::default();
        assert_eq!(
            config.reminder_offsets,
            vec![Duration::hours(24), Duration::hours(1)]
        );
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.delivery_timeout, std::time::Duration::from_secs(10));
        assert_eq!(config.retention, Duration::days(90));
    }

    #[test]
    fn test_builder() {
        let config = NotificationConfig::new("https://gatherly.app")
            .with_reminder_offsets(vec![Duration::minutes(30)])
            .with_batch_size(10)
            .with_max_concurrent_deliveries(0);

        assert_eq!(config.base_url, "https://gatherly.app");
        assert_eq!(config.reminder_offsets, vec![Duration::minutes(30)]);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_concurrent_deliveries, 1);
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(
            parse_offsets("1440, 60"),
            Some(vec![Duration::hours(24), Duration::hours(1)])
        );
        assert_eq!(parse_offsets("15,abc"), None);
        assert_eq!(parse_offsets("-5"), None);
        assert_eq!(parse_offsets(""), Some(Vec::new()));
    }
}
