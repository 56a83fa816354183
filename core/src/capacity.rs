//! Capacity & waitlist engine.
//!
//! Decides whether a user joining an event is seated or waitlisted and which
//! waitlisted users move up when a seat frees.
//!
//! Every function here is pure. Callers pass the event together with the
//! *current* RSVPs for that event and receive a decision; persisting that
//! decision atomically with the read is the caller's job.
//!
//! # Waitlist order
//!
//! Promotion is strict FIFO by `created_at`. Candidates are stable-sorted, so
//! RSVPs with identical timestamps keep the order in which they appear in
//! the input slice.

use crate::error::RsvpError;
use crate::types::{Event, EventRsvp, RsvpStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Data Structures
// ============================================================================

/// Remaining seats for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spots", rename_all = "lowercase")]
pub enum Availability {
    /// The event has no seat limit.
    Unlimited,
    /// Seats left, never negative.
    Limited(u32),
}

impl Availability {
    /// Seats left, or `None` when unlimited.
    #[must_use]
    pub const fn spots(&self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(spots) => Some(*spots),
        }
    }

    /// Returns `true` if no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Limited(0))
    }
}

/// Aggregate capacity view for read paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityInfo {
    /// Seat limit, `None` for unlimited
    pub capacity: Option<u32>,
    /// RSVPs holding a seat
    pub going_count: u32,
    /// RSVPs on the waitlist
    pub waitlisted_count: u32,
    /// Seats left
    pub available_spots: Availability,
    /// Every seat is taken
    pub is_at_capacity: bool,
    /// At least one user is waiting
    pub has_waitlist: bool,
}

/// Result of a create or update decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsvpOutcome {
    /// The RSVP record to persist
    pub rsvp: EventRsvp,
    /// The user asked for a seat but was put on the waitlist
    pub was_waitlisted: bool,
    /// Waitlisted users moved up as a side effect
    pub promotion_occurred: bool,
    /// Users to promote, in waitlist order
    pub promoted_users: Vec<UserId>,
}

/// Result of a withdrawal decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// The RSVP record to delete
    pub removed: EventRsvp,
    /// Users to promote into the freed seat, in waitlist order
    pub promoted_users: Vec<UserId>,
}

// ============================================================================
// Decisions
// ============================================================================

/// Check that `user_id` has no RSVP yet.
///
/// # Errors
///
/// Returns [`RsvpError::AlreadyRsvped`] if the user already responded.
pub fn can_join(rsvps: &[EventRsvp], user_id: UserId) -> Result<(), RsvpError> {
    if rsvps.iter().any(|r| r.user_id == user_id) {
        return Err(RsvpError::AlreadyRsvped { user_id });
    }
    Ok(())
}

/// Decide the RSVP for a user responding for the first time.
///
/// A `going` request is seated while seats remain and waitlisted otherwise.
/// Other statuses are recorded as requested without looking at capacity.
///
/// # Errors
///
/// Returns [`RsvpError::AlreadyRsvped`] if the user already responded.
pub fn process_new_rsvp(
    event: &Event,
    rsvps: &[EventRsvp],
    user_id: UserId,
    requested: RsvpStatus,
    now: DateTime<Utc>,
) -> Result<RsvpOutcome, RsvpError> {
    can_join(rsvps, user_id)?;

    let (status, was_waitlisted) = if requested.is_seated() {
        seat_or_waitlist(event, going_count(rsvps))
    } else {
        (requested, false)
    };

    Ok(RsvpOutcome {
        rsvp: EventRsvp::new(event.id, user_id, status, now),
        was_waitlisted,
        promotion_occurred: false,
        promoted_users: Vec::new(),
    })
}

/// Decide a status change for a user who already responded.
///
/// `rsvps` holds every RSVP for the event, including the user's own. A move
/// to `going` is re-evaluated against the other users' seats; a user already
/// going keeps their seat. Leaving `going` frees a seat, and the outcome then
/// lists the waitlisted users to promote into it.
///
/// # Errors
///
/// Returns [`RsvpError::NotRsvped`] if the user has no RSVP.
pub fn update_rsvp(
    event: &Event,
    rsvps: &[EventRsvp],
    user_id: UserId,
    new_status: RsvpStatus,
    now: DateTime<Utc>,
) -> Result<RsvpOutcome, RsvpError> {
    let prior = find(rsvps, user_id).ok_or(RsvpError::NotRsvped { user_id })?;
    let others = || rsvps.iter().filter(move |r| r.user_id != user_id);

    if new_status.is_seated() {
        let (status, was_waitlisted) = if prior.status.is_seated() {
            (RsvpStatus::Going, false)
        } else {
            seat_or_waitlist(event, going_count(others()))
        };

        return Ok(RsvpOutcome {
            rsvp: prior.with_status(status, now),
            was_waitlisted,
            promotion_occurred: false,
            promoted_users: Vec::new(),
        });
    }

    let promoted_users = if prior.status.is_seated() {
        let spots = available_after(event, going_count(others()));
        promotion_candidates(event, others(), spots)
    } else {
        Vec::new()
    };

    Ok(RsvpOutcome {
        rsvp: prior.with_status(new_status, now),
        was_waitlisted: false,
        promotion_occurred: !promoted_users.is_empty(),
        promoted_users,
    })
}

/// Decide the removal of a user's RSVP.
///
/// # Errors
///
/// Returns [`RsvpError::NotRsvped`] if the user has no RSVP.
pub fn withdraw_rsvp(
    event: &Event,
    rsvps: &[EventRsvp],
    user_id: UserId,
) -> Result<WithdrawOutcome, RsvpError> {
    let removed = find(rsvps, user_id)
        .cloned()
        .ok_or(RsvpError::NotRsvped { user_id })?;

    let others = || rsvps.iter().filter(move |r| r.user_id != user_id);
    let promoted_users = if removed.status.is_seated() {
        let spots = available_after(event, going_count(others()));
        promotion_candidates(event, others(), spots)
    } else {
        Vec::new()
    };

    Ok(WithdrawOutcome {
        removed,
        promoted_users,
    })
}

/// Pick up to `available_spots` waitlisted users, earliest first.
///
/// Returns nothing for unlimited events or when no spot is available.
#[must_use]
pub fn get_users_to_promote(
    event: &Event,
    rsvps: &[EventRsvp],
    available_spots: u32,
) -> Vec<UserId> {
    promotion_candidates(event, rsvps.iter(), available_spots)
}

/// Seats left: capacity minus seated users, floored at zero.
#[must_use]
pub fn calculate_available_spots(event: &Event, rsvps: &[EventRsvp]) -> Availability {
    match event.capacity {
        None => Availability::Unlimited,
        Some(capacity) => Availability::Limited(capacity.saturating_sub(going_count(rsvps))),
    }
}

/// Aggregate capacity view.
#[must_use]
pub fn get_capacity_info(event: &Event, rsvps: &[EventRsvp]) -> CapacityInfo {
    let available_spots = calculate_available_spots(event, rsvps);
    let waitlisted_count = count_status(rsvps, RsvpStatus::Waitlisted);

    CapacityInfo {
        capacity: event.capacity,
        going_count: going_count(rsvps),
        waitlisted_count,
        available_spots,
        is_at_capacity: available_spots.is_full(),
        has_waitlist: waitlisted_count > 0,
    }
}

/// Assert that a seat is free.
///
/// # Errors
///
/// Returns [`RsvpError::EventAtCapacity`] if every seat is taken.
pub fn ensure_seat_available(event: &Event, rsvps: &[EventRsvp]) -> Result<(), RsvpError> {
    match (event.capacity, calculate_available_spots(event, rsvps)) {
        (Some(capacity), Availability::Limited(0)) => Err(RsvpError::EventAtCapacity { capacity }),
        _ => Ok(()),
    }
}

/// Move one specific waitlisted user into a free seat.
///
/// # Errors
///
/// Returns [`RsvpError::NotRsvped`] if the user has no RSVP, or
/// [`RsvpError::CannotPromoteFromWaitlist`] if they are not waitlisted or no
/// seat is free.
pub fn promote_from_waitlist(
    event: &Event,
    rsvps: &[EventRsvp],
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<EventRsvp, RsvpError> {
    let rsvp = find(rsvps, user_id).ok_or(RsvpError::NotRsvped { user_id })?;

    if rsvp.status != RsvpStatus::Waitlisted {
        return Err(RsvpError::CannotPromoteFromWaitlist {
            user_id,
            reason: format!("status is {}, not waitlisted", rsvp.status),
        });
    }

    if calculate_available_spots(event, rsvps).is_full() {
        return Err(RsvpError::CannotPromoteFromWaitlist {
            user_id,
            reason: "no seat available".to_string(),
        });
    }

    Ok(rsvp.with_status(RsvpStatus::Going, now))
}

/// Build the `going` records for a list of promoted users.
///
/// Users in `promoted` without a waitlisted RSVP are skipped.
#[must_use]
pub fn promoted_records(
    rsvps: &[EventRsvp],
    promoted: &[UserId],
    now: DateTime<Utc>,
) -> Vec<EventRsvp> {
    promoted
        .iter()
        .filter_map(|user_id| find(rsvps, *user_id))
        .filter(|r| r.status == RsvpStatus::Waitlisted)
        .map(|r| r.with_status(RsvpStatus::Going, now))
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

fn find(rsvps: &[EventRsvp], user_id: UserId) -> Option<&EventRsvp> {
    rsvps.iter().find(|r| r.user_id == user_id)
}

fn going_count<'a>(rsvps: impl IntoIterator<Item = &'a EventRsvp>) -> u32 {
    let count = rsvps.into_iter().filter(|r| r.status.is_seated()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn count_status(rsvps: &[EventRsvp], status: RsvpStatus) -> u32 {
    let count = rsvps.iter().filter(|r| r.status == status).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn seat_or_waitlist(event: &Event, going: u32) -> (RsvpStatus, bool) {
    match event.capacity {
        Some(capacity) if going >= capacity => (RsvpStatus::Waitlisted, true),
        _ => (RsvpStatus::Going, false),
    }
}

fn available_after(event: &Event, going: u32) -> u32 {
    event
        .capacity
        .map_or(0, |capacity| capacity.saturating_sub(going))
}

fn promotion_candidates<'a>(
    event: &Event,
    rsvps: impl Iterator<Item = &'a EventRsvp>,
    available_spots: u32,
) -> Vec<UserId> {
    if event.is_unlimited() || available_spots == 0 {
        return Vec::new();
    }

    let mut waitlisted: Vec<&EventRsvp> = rsvps
        .filter(|r| r.status == RsvpStatus::Waitlisted)
        .collect();
    // Stable: equal timestamps keep input order.
    waitlisted.sort_by_key(|r| r.created_at);

    waitlisted
        .into_iter()
        .take(usize::try_from(available_spots).unwrap_or(usize::MAX))
        .map(|r| r.user_id)
        .collect()
}
