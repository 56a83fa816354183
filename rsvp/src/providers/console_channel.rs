//! Console delivery channel for development.

use crate::error::Result;
use crate::providers::DeliveryChannel;
use tracing::info;

/// Logs messages instead of sending them.
///
/// The worker falls back to this channel when no SMTP host is configured.
#[derive(Clone, Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    /// Create a new console channel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DeliveryChannel for ConsoleChannel {
    async fn send_content(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        info!(
            to = %recipients.join(", "),
            subject = %subject,
            "📧 Notification (console channel)"
        );
        println!("\n┌─ {subject}");
        println!("│ To: {}", recipients.join(", "));
        for line in body.lines() {
            println!("│ {line}");
        }
        println!("└─\n");

        Ok(())
    }
}
