//! Outbound delivery channel trait.

use crate::error::Result;

/// Outbound channel (email, push, ...).
///
/// The dispatcher bounds every call with its own timeout, so implementations
/// may block for as long as their transport does.
pub trait DeliveryChannel: Send + Sync {
    /// Send rendered content.
    ///
    /// # Arguments
    ///
    /// - `recipients`: delivery addresses
    /// - `subject`: message subject
    /// - `body`: rendered body
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::DeliveryFailed`](crate::NotifyError::DeliveryFailed)
    /// if the transport rejects the message.
    fn send_content(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
