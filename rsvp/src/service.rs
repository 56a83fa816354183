//! RSVP service: the entry point for joining, changing and leaving events.
//!
//! Each request loads a fresh snapshot of the event's RSVPs while holding
//! that event's lock, runs it through the [`RsvpReducer`], and applies the
//! returned persistence effects before releasing the lock. Notification
//! effects run after the lock is released; a notification failure is logged
//! and does not undo the RSVP.
//!
//! The lock serializes requests within one process. Several processes
//! writing RSVPs for the same event need the repository to serialize them.

use crate::environment::Collaborators;
use crate::error::{NotifyError, Result};
use crate::providers::{
    EventDetails, EventDirectory, PermissionAction, PermissionGate, RsvpRepository,
};
use crate::triggers::TriggerService;
use gatherly_core::capacity::{self, CapacityInfo, RsvpOutcome, WithdrawOutcome};
use gatherly_core::validation::validate_requested_status;
use gatherly_core::{
    EventId, Reducer, RsvpAction, RsvpDecision, RsvpEffect, RsvpReducer, RsvpState, RsvpStatus,
    UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

type EventLocks = Arc<Mutex<HashMap<EventId, Arc<tokio::sync::Mutex<()>>>>>;

/// RSVP entry point.
pub struct RsvpService<Env: Collaborators> {
    env: Arc<Env>,
    triggers: TriggerService<Env>,
    reducer: RsvpReducer,
    locks: EventLocks,
}

impl<Env: Collaborators> Clone for RsvpService<Env> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
            triggers: self.triggers.clone(),
            reducer: self.reducer,
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<Env: Collaborators> RsvpService<Env> {
    /// Create an RSVP service.
    #[must_use]
    pub fn new(env: Arc<Env>, triggers: TriggerService<Env>) -> Self {
        Self {
            env,
            triggers,
            reducer: RsvpReducer::new(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a user's RSVP.
    ///
    /// A `going` request on a full event is recorded as `waitlisted`.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::Validation`] if `requested` is `waitlisted`
    /// - [`NotifyError::Forbidden`] if the gate refuses
    /// - [`NotifyError::EventNotFound`] for an unknown event
    /// - [`NotifyError::Rsvp`] if the user already has an RSVP
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        actor: UserId,
        event_id: EventId,
        requested: RsvpStatus,
    ) -> Result<RsvpOutcome> {
        validate_requested_status(requested)?;
        self.authorize(actor, PermissionAction::RsvpToEvent(event_id))
            .await?;

        let outcome = self
            .run(event_id, RsvpAction::Join { actor, requested })
            .await
            .and_then(rsvp_outcome)?;

        info!(
            status = %outcome.rsvp.status,
            waitlisted = outcome.was_waitlisted,
            "RSVP created"
        );
        Ok(outcome)
    }

    /// Change an existing RSVP.
    ///
    /// Leaving `going` frees the seat: the earliest waitlisted users are
    /// promoted and the actor's pending reminders are cancelled. Repeating
    /// the current status sends no new confirmation.
    ///
    /// # Errors
    ///
    /// As [`join`](Self::join), with [`NotifyError::Rsvp`] when the user has
    /// no RSVP.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        actor: UserId,
        event_id: EventId,
        new_status: RsvpStatus,
    ) -> Result<RsvpOutcome> {
        validate_requested_status(new_status)?;
        self.authorize(actor, PermissionAction::RsvpToEvent(event_id))
            .await?;

        let outcome = self
            .run(event_id, RsvpAction::Change { actor, new_status })
            .await
            .and_then(rsvp_outcome)?;

        info!(
            status = %outcome.rsvp.status,
            promoted = outcome.promoted_users.len(),
            "RSVP changed"
        );
        Ok(outcome)
    }

    /// Remove a user's RSVP entirely.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Forbidden`], [`NotifyError::EventNotFound`], or
    /// [`NotifyError::Rsvp`] when the user has no RSVP.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, actor: UserId, event_id: EventId) -> Result<WithdrawOutcome> {
        self.authorize(actor, PermissionAction::RsvpToEvent(event_id))
            .await?;

        let outcome = match self.run(event_id, RsvpAction::Withdraw { actor }).await? {
            RsvpDecision::Withdraw(outcome) => outcome,
            RsvpDecision::Rsvp(_) => return Err(unexpected_decision()),
        };

        info!(
            promoted = outcome.promoted_users.len(),
            "RSVP withdrawn"
        );
        Ok(outcome)
    }

    /// Seat summary for an event.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Forbidden`] or [`NotifyError::EventNotFound`].
    pub async fn capacity_info(&self, actor: UserId, event_id: EventId) -> Result<CapacityInfo> {
        self.authorize(actor, PermissionAction::ViewEvent(event_id))
            .await?;
        let details = self.event(event_id).await?;
        let rsvps = self.env.rsvps().get_event_rsvps(event_id).await?;
        Ok(capacity::get_capacity_info(&details.event, &rsvps))
    }

    /// Number of events that currently hold a lock entry.
    ///
    /// Entries are dropped when their last request finishes, so this is zero
    /// whenever the service is idle.
    #[must_use]
    pub fn locked_events(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Reduce one action under the event lock and run its effects.
    async fn run(&self, event_id: EventId, action: RsvpAction) -> Result<RsvpDecision> {
        let (decision, notices) = {
            let slot = EventSlot::acquire(&self.locks, event_id);
            let _held = slot.mutex.lock().await;

            let details = self.event(event_id).await?;
            let rsvps = self.env.rsvps().get_event_rsvps(event_id).await?;
            let mut state = RsvpState::new(details.event, rsvps);

            let effects = self.reducer.reduce(&mut state, action, self.env.clock())?;
            let decision = state.last_decision.take().ok_or_else(unexpected_decision)?;

            let (writes, notices): (Vec<_>, Vec<_>) =
                effects.into_iter().partition(RsvpEffect::is_persistence);
            for effect in &writes {
                self.persist(event_id, effect).await?;
            }
            (decision, notices)
        };

        for effect in notices {
            self.notify(event_id, effect).await;
        }
        Ok(decision)
    }

    async fn persist(&self, event_id: EventId, effect: &RsvpEffect) -> Result<()> {
        match effect {
            RsvpEffect::Save(rsvp) => self.env.rsvps().save_rsvp(rsvp).await,
            RsvpEffect::Delete(user_id) => self
                .env
                .rsvps()
                .delete_rsvp(event_id, *user_id)
                .await
                .map(|_| ()),
            _ => Ok(()),
        }
    }

    async fn notify(&self, event_id: EventId, effect: RsvpEffect) {
        match effect {
            RsvpEffect::CancelReminders(user_id) => {
                if let Err(err) = self.triggers.cancel_pending_reminders(event_id, user_id).await {
                    warn!(error = %err, %user_id, "Pending reminders not cancelled");
                }
            }
            RsvpEffect::Confirm { user_id, status } => {
                if let Err(err) = self
                    .triggers
                    .on_rsvp_confirmation(event_id, user_id, status)
                    .await
                {
                    warn!(error = %err, %user_id, "RSVP confirmation not created");
                }
            }
            RsvpEffect::AnnouncePromotion(user_id) => {
                if let Err(err) = self.triggers.on_waitlist_promotion(event_id, user_id).await {
                    warn!(error = %err, %user_id, "Promotion confirmation not created");
                }
            }
            RsvpEffect::Save(_) | RsvpEffect::Delete(_) => {
                debug!("Persistence effect reached the notification phase");
            }
        }
    }

    async fn authorize(&self, actor: UserId, action: PermissionAction) -> Result<()> {
        if self.env.permissions().is_allowed(actor, action).await? {
            Ok(())
        } else {
            Err(NotifyError::Forbidden {
                actor,
                action: action.to_string(),
            })
        }
    }

    async fn event(&self, event_id: EventId) -> Result<EventDetails> {
        self.env
            .events()
            .get_event_with_details(event_id)
            .await?
            .ok_or(NotifyError::EventNotFound(event_id))
    }
}

fn rsvp_outcome(decision: RsvpDecision) -> Result<RsvpOutcome> {
    match decision {
        RsvpDecision::Rsvp(outcome) => Ok(outcome),
        RsvpDecision::Withdraw(_) => Err(unexpected_decision()),
    }
}

fn unexpected_decision() -> NotifyError {
    NotifyError::InternalError("RSVP reducer returned an unexpected decision".to_string())
}

/// A reference to one event's lock, tracked in the shared map.
///
/// Dropping the last reference removes the map entry.
struct EventSlot {
    locks: EventLocks,
    event_id: EventId,
    mutex: Arc<tokio::sync::Mutex<()>>,
}

impl EventSlot {
    fn acquire(locks: &EventLocks, event_id: EventId) -> Self {
        let mutex = Arc::clone(
            locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(event_id)
                .or_default(),
        );
        Self {
            locks: Arc::clone(locks),
            event_id,
            mutex,
        }
    }
}

impl Drop for EventSlot {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map holds one reference and this slot the other.
        let last = locks
            .get(&self.event_id)
            .is_some_and(|m| Arc::ptr_eq(m, &self.mutex) && Arc::strong_count(m) == 2);
        if last {
            locks.remove(&self.event_id);
        }
    }
}
