//! Recording delivery channel for testing.

use crate::error::{NotifyError, Result};
use crate::providers::DeliveryChannel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A message captured by [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipients.
    pub recipients: Vec<String>,
    /// Subject.
    pub subject: String,
    /// Body.
    pub body: String,
}

/// Channel that records messages instead of sending them.
///
/// Can be told to fail the next N sends or to stall each send.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failures_left: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl RecordingChannel {
    /// Create a channel that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends.
    #[must_use]
    pub fn failing(count: usize) -> Self {
        let channel = Self::default();
        channel.fail_next(count);
        channel
    }

    /// Sleep for `delay` before each send.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `count` sends.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DeliveryChannel for RecordingChannel {
    async fn send_content(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(NotifyError::DeliveryFailed("simulated failure".to_string()));
        }

        self.sent
            .lock()
            .map_err(|_| NotifyError::InternalError("channel lock poisoned".to_string()))?
            .push(SentMessage {
                recipients: recipients.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
