//! RSVP reducer.
//!
//! Reducers are pure functions: `(State, Action, Environment) -> (State, Effects)`.
//! The RSVP reducer runs the capacity engine over a snapshot of one event's
//! RSVPs, updates the snapshot in place, and returns descriptions of the
//! writes and notifications the caller must perform. It never performs them.

use crate::capacity::{self, RsvpOutcome, WithdrawOutcome};
use crate::environment::Clock;
use crate::error::RsvpError;
use crate::types::{Event, EventRsvp, RsvpStatus, UserId};

/// Core abstraction for decision logic.
///
/// # Type Parameters
///
/// - `State`: the snapshot this reducer operates on
/// - `Action`: the requests it processes
/// - `Effect`: descriptions of side effects for the caller to run
/// - `Environment`: injected dependencies (time)
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// Side effect descriptions returned to the caller
    type Effect;

    /// Rejection type for invalid actions
    type Error;

    /// The environment type with injected dependencies
    type Environment: ?Sized;

    /// Reduce an action into state changes and effects.
    ///
    /// A rejected action leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns the reducer's error type when the action is not allowed in
    /// the current state.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Vec<Self::Effect>, Self::Error>;
}

/// Snapshot of one event and its RSVPs.
#[derive(Clone, Debug)]
pub struct RsvpState {
    /// The event
    pub event: Event,
    /// Every RSVP on the event
    pub rsvps: Vec<EventRsvp>,
    /// Decision made by the last accepted action
    pub last_decision: Option<RsvpDecision>,
}

impl RsvpState {
    /// Wrap a freshly loaded snapshot.
    #[must_use]
    pub const fn new(event: Event, rsvps: Vec<EventRsvp>) -> Self {
        Self {
            event,
            rsvps,
            last_decision: None,
        }
    }

    /// The RSVP of `user_id`, if any.
    #[must_use]
    pub fn rsvp_of(&self, user_id: UserId) -> Option<&EventRsvp> {
        self.rsvps.iter().find(|r| r.user_id == user_id)
    }

    fn upsert(&mut self, rsvp: &EventRsvp) {
        match self.rsvps.iter_mut().find(|r| r.user_id == rsvp.user_id) {
            Some(existing) => *existing = rsvp.clone(),
            None => self.rsvps.push(rsvp.clone()),
        }
    }
}

/// What the capacity engine decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RsvpDecision {
    /// A new or changed RSVP
    Rsvp(RsvpOutcome),
    /// A removed RSVP
    Withdraw(WithdrawOutcome),
}

/// Requests against one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsvpAction {
    /// Create an RSVP
    Join {
        /// Requesting user
        actor: UserId,
        /// Requested status
        requested: RsvpStatus,
    },
    /// Change an existing RSVP
    Change {
        /// Requesting user
        actor: UserId,
        /// New status
        new_status: RsvpStatus,
    },
    /// Remove an RSVP
    Withdraw {
        /// Requesting user
        actor: UserId,
    },
}

/// Side effects of an accepted RSVP action.
///
/// Persistence effects come first and must all be applied before any
/// notification effect runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RsvpEffect {
    /// Insert or overwrite an RSVP record
    Save(EventRsvp),
    /// Delete a user's RSVP record
    Delete(UserId),
    /// Cancel the user's undelivered reminders
    CancelReminders(UserId),
    /// Confirm the user's new status
    Confirm {
        /// Recipient
        user_id: UserId,
        /// Status to confirm
        status: RsvpStatus,
    },
    /// Confirm a seat won from the waitlist
    AnnouncePromotion(UserId),
}

impl RsvpEffect {
    /// Whether this effect writes RSVP records.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Save(_) | Self::Delete(_))
    }
}

/// Reducer for joining, changing and withdrawing RSVPs.
#[derive(Clone, Copy, Debug, Default)]
pub struct RsvpReducer;

impl RsvpReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for RsvpReducer {
    type State = RsvpState;
    type Action = RsvpAction;
    type Effect = RsvpEffect;
    type Error = RsvpError;
    type Environment = dyn Clock;

    fn reduce(
        &self,
        state: &mut RsvpState,
        action: RsvpAction,
        env: &dyn Clock,
    ) -> Result<Vec<RsvpEffect>, RsvpError> {
        let now = env.now();

        match action {
            RsvpAction::Join { actor, requested } => {
                let outcome =
                    capacity::process_new_rsvp(&state.event, &state.rsvps, actor, requested, now)?;

                state.upsert(&outcome.rsvp);
                let effects = vec![
                    RsvpEffect::Save(outcome.rsvp.clone()),
                    RsvpEffect::Confirm {
                        user_id: actor,
                        status: outcome.rsvp.status,
                    },
                ];
                state.last_decision = Some(RsvpDecision::Rsvp(outcome));
                Ok(effects)
            }

            RsvpAction::Change { actor, new_status } => {
                let outcome =
                    capacity::update_rsvp(&state.event, &state.rsvps, actor, new_status, now)?;
                let promoted =
                    capacity::promoted_records(&state.rsvps, &outcome.promoted_users, now);
                let previous = state.rsvp_of(actor).map(|r| r.status);
                let unchanged = previous == Some(outcome.rsvp.status);
                let left_seat =
                    previous.is_some_and(|s| s.is_seated()) && !outcome.rsvp.status.is_seated();

                let mut effects = vec![RsvpEffect::Save(outcome.rsvp.clone())];
                effects.extend(promoted.iter().cloned().map(RsvpEffect::Save));
                if left_seat {
                    effects.push(RsvpEffect::CancelReminders(actor));
                }
                if !unchanged {
                    effects.push(RsvpEffect::Confirm {
                        user_id: actor,
                        status: outcome.rsvp.status,
                    });
                }
                effects.extend(
                    outcome
                        .promoted_users
                        .iter()
                        .copied()
                        .map(RsvpEffect::AnnouncePromotion),
                );

                state.upsert(&outcome.rsvp);
                for rsvp in &promoted {
                    state.upsert(rsvp);
                }
                state.last_decision = Some(RsvpDecision::Rsvp(outcome));
                Ok(effects)
            }

            RsvpAction::Withdraw { actor } => {
                let outcome = capacity::withdraw_rsvp(&state.event, &state.rsvps, actor)?;
                let promoted =
                    capacity::promoted_records(&state.rsvps, &outcome.promoted_users, now);

                let mut effects = vec![RsvpEffect::Delete(actor)];
                effects.extend(promoted.iter().cloned().map(RsvpEffect::Save));
                if outcome.removed.status.is_seated() {
                    effects.push(RsvpEffect::CancelReminders(actor));
                }
                effects.extend(
                    outcome
                        .promoted_users
                        .iter()
                        .copied()
                        .map(RsvpEffect::AnnouncePromotion),
                );

                state.rsvps.retain(|r| r.user_id != actor);
                for rsvp in &promoted {
                    state.upsert(rsvp);
                }
                state.last_decision = Some(RsvpDecision::Withdraw(outcome));
                Ok(effects)
            }
        }
    }
}
