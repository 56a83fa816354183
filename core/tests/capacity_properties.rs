//! Property tests for the capacity & waitlist engine.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use gatherly_core::capacity::{self, Availability};
use gatherly_core::types::{Event, EventRsvp, RsvpStatus, UserId};
use gatherly_core::RsvpError;
use gatherly_testing::properties::{capacity, requestable_status};
use gatherly_testing::{fixtures, test_time};
use proptest::prelude::*;

/// Apply a sequence of join requests the way a caller would: each outcome is
/// appended to the snapshot before the next request is decided.
fn join_all(event: &Event, requests: &[RsvpStatus]) -> Vec<EventRsvp> {
    let mut rsvps = Vec::new();
    for (i, requested) in requests.iter().enumerate() {
        let now = test_time() + Duration::seconds(i64::try_from(i).unwrap());
        let outcome =
            capacity::process_new_rsvp(event, &rsvps, UserId::new(), *requested, now).unwrap();
        rsvps.push(outcome.rsvp);
    }
    rsvps
}

fn event_with(capacity: Option<u32>) -> Event {
    let base = fixtures::event(test_time());
    match capacity {
        Some(c) => Event {
            capacity: Some(c),
            ..base
        },
        None => base,
    }
}

fn seated(rsvps: &[EventRsvp]) -> usize {
    rsvps.iter().filter(|r| r.status == RsvpStatus::Going).count()
}

proptest! {
    #[test]
    fn prop_never_more_seated_than_capacity(
        cap in capacity(),
        requests in prop::collection::vec(requestable_status(), 0..40),
    ) {
        let event = event_with(cap);
        let rsvps = join_all(&event, &requests);

        if let Some(c) = cap {
            prop_assert!(seated(&rsvps) <= c as usize);
        }
    }

    #[test]
    fn prop_unlimited_event_never_waitlists(
        requests in prop::collection::vec(requestable_status(), 0..40),
    ) {
        let event = event_with(None);
        let rsvps = join_all(&event, &requests);

        prop_assert!(rsvps.iter().all(|r| r.status != RsvpStatus::Waitlisted));
        prop_assert_eq!(
            capacity::calculate_available_spots(&event, &rsvps),
            Availability::Unlimited
        );
        prop_assert!(capacity::get_users_to_promote(&event, &rsvps, 10).is_empty());
    }

    #[test]
    fn prop_waitlist_only_forms_when_full(
        cap in 0_u32..6,
        requests in prop::collection::vec(requestable_status(), 0..30),
    ) {
        let event = event_with(Some(cap));
        let rsvps = join_all(&event, &requests);

        let waitlisted = rsvps.iter().any(|r| r.status == RsvpStatus::Waitlisted);
        if waitlisted {
            prop_assert_eq!(seated(&rsvps), cap as usize);
        }
    }

    #[test]
    fn prop_promotion_is_fifo(
        cap in 1_u32..5,
        extra in 1_usize..8,
        freed in 1_u32..5,
    ) {
        let event = event_with(Some(cap));
        let requests = vec![RsvpStatus::Going; cap as usize + extra];
        let rsvps = join_all(&event, &requests);

        let mut waiting: Vec<&EventRsvp> = rsvps
            .iter()
            .filter(|r| r.status == RsvpStatus::Waitlisted)
            .collect();
        waiting.sort_by_key(|r| r.created_at);

        let promoted = capacity::get_users_to_promote(&event, &rsvps, freed);
        let expected: Vec<UserId> = waiting
            .iter()
            .take(freed as usize)
            .map(|r| r.user_id)
            .collect();

        prop_assert_eq!(promoted, expected);
    }

    #[test]
    fn prop_can_join_rejects_every_existing_user(
        requests in prop::collection::vec(requestable_status(), 1..20),
    ) {
        let event = event_with(Some(3));
        let rsvps = join_all(&event, &requests);

        for rsvp in &rsvps {
            prop_assert_eq!(
                capacity::can_join(&rsvps, rsvp.user_id),
                Err(RsvpError::AlreadyRsvped { user_id: rsvp.user_id })
            );
        }
        prop_assert!(capacity::can_join(&rsvps, UserId::new()).is_ok());
    }

    #[test]
    fn prop_leaving_a_seat_keeps_capacity(
        cap in 1_u32..5,
        extra in 0_usize..6,
        leaver in 0_usize..5,
    ) {
        let event = event_with(Some(cap));
        let mut rsvps = join_all(&event, &vec![RsvpStatus::Going; cap as usize + extra]);
        let leaver = rsvps[leaver % cap as usize].user_id;
        let later = test_time() + Duration::hours(1);

        let outcome =
            capacity::update_rsvp(&event, &rsvps, leaver, RsvpStatus::Declined, later).unwrap();
        let promoted = capacity::promoted_records(&rsvps, &outcome.promoted_users, later);

        for record in std::iter::once(&outcome.rsvp).chain(&promoted) {
            if let Some(slot) = rsvps.iter_mut().find(|r| r.user_id == record.user_id) {
                *slot = record.clone();
            }
        }

        prop_assert_eq!(outcome.promotion_occurred, extra > 0);
        prop_assert_eq!(seated(&rsvps), (cap as usize).min(cap as usize - 1 + extra));
    }
}

#[test]
fn capacity_one_handover_between_two_users() {
    let now = test_time();
    let event = event_with(Some(1));
    let a = UserId::new();
    let b = UserId::new();

    let first = capacity::process_new_rsvp(&event, &[], a, RsvpStatus::Going, now).unwrap();
    assert_eq!(first.rsvp.status, RsvpStatus::Going);

    let second = capacity::process_new_rsvp(
        &event,
        std::slice::from_ref(&first.rsvp),
        b,
        RsvpStatus::Going,
        now + Duration::seconds(1),
    )
    .unwrap();
    assert_eq!(second.rsvp.status, RsvpStatus::Waitlisted);
    assert!(second.was_waitlisted);

    let snapshot = vec![first.rsvp, second.rsvp];
    let decline = capacity::update_rsvp(
        &event,
        &snapshot,
        a,
        RsvpStatus::Declined,
        now + Duration::minutes(1),
    )
    .unwrap();

    assert_eq!(decline.rsvp.status, RsvpStatus::Declined);
    assert!(decline.promotion_occurred);
    assert_eq!(decline.promoted_users, vec![b]);
}
