//! Trigger service: turns domain occurrences into notifications.
//!
//! Every trigger reads all related entities first and fails with a
//! not-found error before creating anything, then persists its whole fan-out
//! with one [`NotificationStore::create_many`] call. A trigger therefore
//! either fans out completely or not at all.

use crate::config::NotificationConfig;
use crate::dispatcher::Dispatcher;
use crate::environment::Collaborators;
use crate::error::{NotifyError, Result};
use crate::providers::{
    EventDetails, EventDirectory, ExpectedState, GroupDirectory, NotificationStore,
    RsvpRepository, UserDirectory, UserProfile,
};
use gatherly_core::notification::{
    EventReminderPayload, EventUpdatePayload, GroupEventPayload, GroupInvitePayload,
    RsvpConfirmationPayload,
};
use gatherly_core::validation::{validate_change_message, validate_invite_token};
use gatherly_core::{
    EventId, GroupId, GroupRole, Notification, NotificationPayload, RsvpStatus,
    UserId,
};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Creates notifications for RSVP, event and group occurrences.
pub struct TriggerService<Env: Collaborators> {
    env: Arc<Env>,
    config: Arc<NotificationConfig>,
    dispatcher: Dispatcher<Env>,
}

impl<Env: Collaborators> Clone for TriggerService<Env> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            config: Arc::clone(&self.config),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<Env: Collaborators> TriggerService<Env> {
    /// Create a trigger service that delivers confirmations through
    /// `dispatcher`.
    #[must_use]
    pub fn new(
        env: Arc<Env>,
        config: Arc<NotificationConfig>,
        dispatcher: Dispatcher<Env>,
    ) -> Self {
        Self {
            env,
            config,
            dispatcher,
        }
    }

    /// Confirm a user's RSVP status.
    ///
    /// Creates one confirmation and delivers it right away. For `going`,
    /// also schedules one reminder per configured offset whose time is still
    /// in the future, replacing any reminders still pending for the same
    /// user and event. Returns every notification created, the confirmation
    /// as stored after its delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown event or user, or a store
    /// error. A failed immediate delivery is recorded on the notification
    /// and does not fail the trigger.
    #[instrument(skip(self))]
    pub async fn on_rsvp_confirmation(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: RsvpStatus,
    ) -> Result<Vec<Notification>> {
        self.confirm(event_id, user_id, status, false).await
    }

    /// Confirm a seat won from the waitlist.
    ///
    /// Same as [`on_rsvp_confirmation`](Self::on_rsvp_confirmation) with
    /// status `going` and the promotion flag set.
    ///
    /// # Errors
    ///
    /// See [`on_rsvp_confirmation`](Self::on_rsvp_confirmation).
    #[instrument(skip(self))]
    pub async fn on_waitlist_promotion(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Vec<Notification>> {
        self.confirm(event_id, user_id, RsvpStatus::Going, true).await
    }

    /// Tell everyone going or waitlisted that the event changed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or overlong message,
    /// [`NotifyError::EventNotFound`], or a store error.
    #[instrument(skip(self, change_message))]
    pub async fn on_event_update(
        &self,
        event_id: EventId,
        change_message: &str,
    ) -> Result<Vec<Notification>> {
        validate_change_message(change_message)?;
        let details = self.event(event_id).await?;
        let rsvps = self.env.rsvps().get_event_rsvps(event_id).await?;

        let now = self.env.clock().now();
        let notifications: Vec<Notification> = rsvps
            .iter()
            .filter(|r| r.status.follows_updates())
            .map(|r| {
                Notification::new(
                    r.user_id,
                    NotificationPayload::EventUpdate(EventUpdatePayload {
                        event_id,
                        event_title: details.event.title.clone(),
                        change_message: change_message.to_string(),
                    }),
                    now,
                )
            })
            .collect();

        self.persist_all(&notifications).await?;
        info!(recipients = notifications.len(), "Event update fanned out");
        Ok(notifications)
    }

    /// Tell every group member except the host about a new event.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::EventNotFound`] or
    /// [`NotifyError::GroupNotFound`], or a store error.
    #[instrument(skip(self))]
    pub async fn on_new_group_event(
        &self,
        event_id: EventId,
        group_id: GroupId,
    ) -> Result<Vec<Notification>> {
        let details = self.event(event_id).await?;
        let group = self
            .env
            .groups()
            .get_group_with_members(group_id)
            .await?
            .ok_or(NotifyError::GroupNotFound(group_id))?;

        let now = self.env.clock().now();
        let host_id = details.event.host_id;
        let notifications: Vec<Notification> = group
            .members
            .iter()
            .filter(|m| m.user_id != host_id)
            .map(|m| {
                Notification::new(
                    m.user_id,
                    NotificationPayload::GroupEvent(GroupEventPayload {
                        event_id,
                        event_title: details.event.title.clone(),
                        group_id,
                        group_name: group.group.name.clone(),
                        host_name: details.host.display_name.clone(),
                        starts_at: details.event.starts_at,
                    }),
                    now,
                )
            })
            .collect();

        self.persist_all(&notifications).await?;
        info!(recipients = notifications.len(), "Group event announced");
        Ok(notifications)
    }

    /// Invite a user to a group.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed token,
    /// [`NotifyError::GroupNotFound`], [`NotifyError::UserNotFound`] for the
    /// invitee or inviter, or a store error.
    #[instrument(skip(self, invite_token))]
    pub async fn on_group_invite(
        &self,
        group_id: GroupId,
        invitee_id: UserId,
        inviter_id: UserId,
        role: GroupRole,
        invite_token: &str,
    ) -> Result<Notification> {
        validate_invite_token(invite_token)?;
        let group = self
            .env
            .groups()
            .get_group_with_members(group_id)
            .await?
            .ok_or(NotifyError::GroupNotFound(group_id))?;
        self.user(invitee_id).await?;
        let inviter = self.user(inviter_id).await?;

        let notification = Notification::new(
            invitee_id,
            NotificationPayload::GroupInvite(GroupInvitePayload {
                group_id,
                group_name: group.group.name,
                inviter_id,
                inviter_name: inviter.display_name,
                role,
                invite_token: invite_token.to_string(),
            }),
            self.env.clock().now(),
        );

        self.persist(&notification).await?;
        Ok(notification)
    }

    /// Cancel undelivered reminders for a user who left an event's seat.
    ///
    /// Returns how many reminders were cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    #[instrument(skip(self))]
    pub async fn cancel_pending_reminders(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<usize> {
        let reminders = self
            .env
            .store()
            .get_pending_reminders(event_id, user_id)
            .await?;

        let mut cancelled = 0;
        for mut reminder in reminders {
            let expected = ExpectedState::of(&reminder);
            if reminder.mark_as_cancelled().is_err() {
                continue;
            }
            if self.env.store().update(&reminder, expected).await? {
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            info!(cancelled, "Pending reminders cancelled");
        }
        Ok(cancelled)
    }

    async fn confirm(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: RsvpStatus,
        promoted: bool,
    ) -> Result<Vec<Notification>> {
        let details = self.event(event_id).await?;
        self.user(user_id).await?;

        let now = self.env.clock().now();
        let confirmation = Notification::new(
            user_id,
            NotificationPayload::RsvpConfirmation(RsvpConfirmationPayload {
                event_id,
                event_title: details.event.title.clone(),
                status,
                starts_at: details.event.starts_at,
                promoted,
            }),
            now,
        );

        let reminders: Vec<Notification> = if status == RsvpStatus::Going {
            self.config
                .reminder_offsets
                .iter()
                .filter_map(|offset| {
                    let at = details.event.starts_at - *offset;
                    (at > now).then(|| {
                        Notification::scheduled(
                            user_id,
                            NotificationPayload::EventReminder(EventReminderPayload {
                                event_id,
                                event_title: details.event.title.clone(),
                                starts_at: details.event.starts_at,
                                minutes_before: offset.num_minutes(),
                            }),
                            at,
                            now,
                        )
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        if status == RsvpStatus::Going {
            self.cancel_pending_reminders(event_id, user_id).await?;
        }

        let confirmation_id = confirmation.id;
        let mut created = Vec::with_capacity(1 + reminders.len());
        created.push(confirmation);
        created.extend(reminders);
        self.persist_all(&created).await?;

        if let Err(err) = self.dispatcher.deliver_by_id(confirmation_id).await {
            warn!(error = %err, "Immediate confirmation delivery could not be recorded");
        }
        match self.env.store().get(confirmation_id).await {
            Ok(Some(stored)) => {
                if let Some(first) = created.first_mut() {
                    *first = stored;
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Delivered confirmation could not be reloaded"),
        }
        Ok(created)
    }

    async fn event(&self, event_id: EventId) -> Result<EventDetails> {
        self.env
            .events()
            .get_event_with_details(event_id)
            .await?
            .ok_or(NotifyError::EventNotFound(event_id))
    }

    async fn user(&self, user_id: UserId) -> Result<UserProfile> {
        self.env
            .users()
            .get_user_with_profile(user_id)
            .await?
            .ok_or(NotifyError::UserNotFound(user_id))
    }

    async fn persist(&self, notification: &Notification) -> Result<()> {
        self.persist_all(std::slice::from_ref(notification)).await
    }

    async fn persist_all(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        self.env.store().create_many(notifications).await?;
        for notification in notifications {
            counter!(
                "notifications_created_total",
                "type" => notification.notification_type.as_str()
            )
            .increment(1);
        }
        Ok(())
    }
}
