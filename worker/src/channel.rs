//! Channel selected at startup.

use crate::config::SmtpConfig;
use gatherly_rsvp::Result;
use gatherly_rsvp::providers::{ConsoleChannel, DeliveryChannel, SmtpChannel};

/// SMTP when configured, console otherwise.
#[derive(Clone)]
pub enum WorkerChannel {
    /// Real email
    Smtp(SmtpChannel),
    /// Log output for development
    Console(ConsoleChannel),
}

impl WorkerChannel {
    /// Build the channel for the given SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns error if the sender address is invalid.
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self> {
        match smtp {
            Some(smtp) => Ok(Self::Smtp(SmtpChannel::new(
                smtp.host.clone(),
                smtp.port,
                smtp.username.clone(),
                smtp.password.clone(),
                &smtp.from,
            )?)),
            None => Ok(Self::Console(ConsoleChannel::new())),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Console(_) => "console",
        }
    }
}

impl DeliveryChannel for WorkerChannel {
    async fn send_content(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        match self {
            Self::Smtp(channel) => channel.send_content(recipients, subject, body).await,
            Self::Console(channel) => channel.send_content(recipients, subject, body).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_without_smtp() {
        let channel = WorkerChannel::from_config(None);
        assert!(matches!(channel, Ok(WorkerChannel::Console(_))));
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "pw".to_string(),
            from: "not a mailbox".to_string(),
        };
        assert!(WorkerChannel::from_config(Some(&smtp)).is_err());
    }

    #[test]
    fn test_smtp_selected() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "pw".to_string(),
            from: "Gatherly <noreply@gatherly.app>".to_string(),
        };
        let channel = WorkerChannel::from_config(Some(&smtp));
        assert_eq!(channel.map(|c| c.name()).ok(), Some("smtp"));
    }
}
