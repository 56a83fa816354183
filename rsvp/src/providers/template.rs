//! Message rendering.

use crate::error::{NotifyError, Result};
use chrono::{DateTime, Utc};
use gatherly_core::notification::{
    EventReminderPayload, EventUpdatePayload, GroupEventPayload, GroupInvitePayload,
    RsvpConfirmationPayload,
};
use gatherly_core::{NotificationPayload, NotificationType, RsvpStatus};

/// Subject and body ready for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    /// Message subject.
    pub subject: String,

    /// Message body.
    pub body: String,
}

/// Turns a notification payload into channel content.
pub trait TemplateRenderer: Send + Sync {
    /// Render the payload of a notification of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TemplateError`] if the payload cannot be
    /// rendered as `notification_type`.
    fn render(
        &self,
        notification_type: NotificationType,
        payload: &NotificationPayload,
    ) -> Result<RenderedContent>;
}

/// Plain-text templates with links into the web app.
#[derive(Debug, Clone)]
pub struct DefaultTemplateRenderer {
    base_url: String,
}

impl DefaultTemplateRenderer {
    /// Create a renderer linking to `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn event_link(&self, event_id: impl std::fmt::Display) -> String {
        format!("{}/events/{event_id}", self.base_url)
    }

    fn confirmation(&self, p: &RsvpConfirmationPayload) -> RenderedContent {
        let when = format_time(p.starts_at);
        let (subject, line) = match (p.status, p.promoted) {
            (RsvpStatus::Going, true) => (
                format!("A spot opened up: you're going to {}", p.event_title),
                format!("Good news! A seat freed up and you've been moved off the waitlist for {}.", p.event_title),
            ),
            (RsvpStatus::Going, false) => (
                format!("You're going to {}", p.event_title),
                format!("Your spot at {} is confirmed.", p.event_title),
            ),
            (RsvpStatus::Waitlisted, _) => (
                format!("You're on the waitlist for {}", p.event_title),
                format!("{} is full. We'll let you know as soon as a seat opens up.", p.event_title),
            ),
            (RsvpStatus::Interested, _) => (
                format!("You're interested in {}", p.event_title),
                format!("We'll keep you posted about {}.", p.event_title),
            ),
            (RsvpStatus::Declined, _) => (
                format!("You declined {}", p.event_title),
                format!("Thanks for letting the host of {} know.", p.event_title),
            ),
        };

        RenderedContent {
            subject,
            body: format!(
                "{line}\n\nStarts: {when}\nDetails: {}\n",
                self.event_link(p.event_id)
            ),
        }
    }

    fn update(&self, p: &EventUpdatePayload) -> RenderedContent {
        RenderedContent {
            subject: format!("Update: {}", p.event_title),
            body: format!(
                "The host of {} posted an update:\n\n{}\n\nDetails: {}\n",
                p.event_title,
                p.change_message,
                self.event_link(p.event_id)
            ),
        }
    }

    fn reminder(&self, p: &EventReminderPayload) -> RenderedContent {
        RenderedContent {
            subject: format!("Starting {}: {}", lead_time(p.minutes_before), p.event_title),
            body: format!(
                "{} starts at {}.\n\nDetails: {}\n",
                p.event_title,
                format_time(p.starts_at),
                self.event_link(p.event_id)
            ),
        }
    }

    fn invite(&self, p: &GroupInvitePayload) -> RenderedContent {
        RenderedContent {
            subject: format!("{} invited you to {}", p.inviter_name, p.group_name),
            body: format!(
                "{} invited you to join {} as {}.\n\nAccept: {}/groups/{}/join?token={}\n",
                p.inviter_name, p.group_name, p.role, self.base_url, p.group_id, p.invite_token
            ),
        }
    }

    fn group_event(&self, p: &GroupEventPayload) -> RenderedContent {
        RenderedContent {
            subject: format!("New in {}: {}", p.group_name, p.event_title),
            body: format!(
                "{} scheduled {} for {}.\n\nStarts: {}\nRSVP: {}\n",
                p.host_name,
                p.event_title,
                p.group_name,
                format_time(p.starts_at),
                self.event_link(p.event_id)
            ),
        }
    }
}

impl TemplateRenderer for DefaultTemplateRenderer {
    fn render(
        &self,
        notification_type: NotificationType,
        payload: &NotificationPayload,
    ) -> Result<RenderedContent> {
        if payload.notification_type() != notification_type {
            return Err(NotifyError::TemplateError(format!(
                "{} payload cannot render as {notification_type}",
                payload.notification_type()
            )));
        }

        Ok(match payload {
            NotificationPayload::RsvpConfirmation(p) => self.confirmation(p),
            NotificationPayload::EventUpdate(p) => self.update(p),
            NotificationPayload::EventReminder(p) => self.reminder(p),
            NotificationPayload::GroupInvite(p) => self.invite(p),
            NotificationPayload::GroupEvent(p) => self.group_event(p),
        })
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%a %-d %b %Y, %H:%M UTC").to_string()
}

fn lead_time(minutes: i64) -> String {
    match minutes {
        m if m >= 1440 && m % 1440 == 0 => match m / 1440 {
            1 => "tomorrow".to_string(),
            d => format!("in {d} days"),
        },
        m if m >= 60 && m % 60 == 0 => match m / 60 {
            1 => "in 1 hour".to_string(),
            h => format!("in {h} hours"),
        },
        m => format!("in {m} minutes"),
    }
}
