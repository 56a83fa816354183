//! SMTP delivery channel using Lettre.

use crate::error::{NotifyError, Result};
use crate::providers::DeliveryChannel;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sends notifications as plain-text email.
///
/// # Examples
///
/// ```no_run
/// use gatherly_rsvp::providers::SmtpChannel;
///
/// let channel = SmtpChannel::new(
///     "smtp.example.com",
///     587,
///     "mailer",
///     "app_password",
///     "Gatherly <noreply@gatherly.app>",
/// )?;
/// # Ok::<(), gatherly_rsvp::NotifyError>(())
/// ```
#[derive(Clone)]
pub struct SmtpChannel {
    /// SMTP server address.
    smtp_server: String,

    /// SMTP server port.
    smtp_port: u16,

    /// SMTP credentials.
    credentials: Credentials,

    /// Sender mailbox.
    from: Mailbox,
}

impl SmtpChannel {
    /// Create a new SMTP channel.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::DeliveryFailed`] if `from` is not a valid
    /// mailbox.
    pub fn new(
        smtp_server: impl Into<String>,
        smtp_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        from: &str,
    ) -> Result<Self> {
        let from = from
            .parse()
            .map_err(|e| NotifyError::DeliveryFailed(format!("Invalid from address: {e}")))?;

        Ok(Self {
            smtp_server: smtp_server.into(),
            smtp_port,
            credentials: Credentials::new(username.into(), password.into()),
            from,
        })
    }

    /// Build the SMTP transport for one send.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| NotifyError::DeliveryFailed(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn build_message(&self, recipients: &[String], subject: &str, body: &str) -> Result<Message> {
        if recipients.is_empty() {
            return Err(NotifyError::DeliveryFailed("No recipients".to_string()));
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for to in recipients {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|e| NotifyError::DeliveryFailed(format!("Invalid to address {to}: {e}")))?;
            builder = builder.to(mailbox);
        }

        builder
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::DeliveryFailed(format!("Failed to build email: {e}")))
    }
}

impl DeliveryChannel for SmtpChannel {
    async fn send_content(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let email = self.build_message(recipients, subject, body)?;
        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| NotifyError::DeliveryFailed(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| NotifyError::InternalError(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> SmtpChannel {
        SmtpChannel::new("localhost", 2525, "u", "p", "Gatherly <noreply@gatherly.app>").unwrap()
    }

    #[test]
    fn test_rejects_bad_from() {
        assert!(SmtpChannel::new("localhost", 25, "u", "p", "not an address").is_err());
    }

    #[test]
    fn test_message_has_every_recipient() {
        let message = channel()
            .build_message(
                &["a@example.com".to_string(), "b@example.com".to_string()],
                "Hello",
                "Body",
            )
            .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn test_no_recipients() {
        assert!(matches!(
            channel().build_message(&[], "Hello", "Body"),
            Err(NotifyError::DeliveryFailed(_))
        ));
    }
}
