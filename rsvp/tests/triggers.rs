//! Trigger service integration tests.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use chrono::Duration;
use common::Harness;
use gatherly_core::{
    EventRsvp, GroupId, GroupRole, NotificationPayload, NotificationStatus, NotificationType,
    RsvpStatus, UserId,
};
use gatherly_rsvp::NotifyError;
use gatherly_rsvp::providers::NotificationStore;

#[tokio::test]
async fn test_group_event_skips_host() {
    let h = Harness::new();
    let host = h.user("Hana");
    let m1 = h.user("Milo");
    let m2 = h.user("Mira");
    let group = h.group("Hikers", &[host, m1, m2]);

    let event = gatherly_testing::fixtures::group_event(group, host, h.now());
    let details = h.register(event);

    let created = h
        .triggers
        .on_new_group_event(details.id(), group)
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|n| n.user_id != host));
    assert!(created
        .iter()
        .all(|n| n.notification_type == NotificationType::GroupEvent));
}

#[tokio::test]
async fn test_event_update_reaches_going_and_waitlisted_only() {
    let h = Harness::new();
    let details = h.event(Some(1), Duration::days(3));
    let (u1, u2, u3) = (h.user("U1"), h.user("U2"), h.user("U3"));
    for (user, status) in [
        (u1, RsvpStatus::Going),
        (u2, RsvpStatus::Waitlisted),
        (u3, RsvpStatus::Declined),
    ] {
        h.directory
            .insert_rsvp(EventRsvp::new(details.id(), user, status, h.now()))
            .unwrap();
    }

    let created = h
        .triggers
        .on_event_update(details.id(), "Moved to the north lawn")
        .await
        .unwrap();

    let mut recipients: Vec<UserId> = created.iter().map(|n| n.user_id).collect();
    recipients.sort();
    let mut expected = vec![u1, u2];
    expected.sort();
    assert_eq!(recipients, expected);

    match &created[0].payload {
        NotificationPayload::EventUpdate(p) => {
            assert_eq!(p.change_message, "Moved to the north lawn");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn test_event_update_rejects_empty_message() {
    let h = Harness::new();
    let details = h.event(None, Duration::days(1));

    let err = h.triggers.on_event_update(details.id(), "  ").await.unwrap_err();

    assert!(matches!(err, NotifyError::Validation(_)));
    assert!(h.store.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_going_confirmation_sends_and_schedules_reminders() {
    let h = Harness::new();
    let details = h.event(Some(10), Duration::days(7));
    let user = h.user("Greta");

    let created = h
        .triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert_eq!(created[0].status, NotificationStatus::Sent);
    assert!(created[0].sent_at.is_some());

    let stored = h.store.all().unwrap();
    let confirmation = stored
        .iter()
        .find(|n| n.notification_type == NotificationType::RsvpConfirmation)
        .unwrap();
    assert_eq!(confirmation.status, NotificationStatus::Sent);

    let mut reminder_times: Vec<_> = stored
        .iter()
        .filter(|n| n.notification_type == NotificationType::EventReminder)
        .map(|n| n.scheduled_at)
        .collect();
    reminder_times.sort();
    assert_eq!(
        reminder_times,
        vec![
            details.event.starts_at - Duration::hours(24),
            details.event.starts_at - Duration::hours(1),
        ]
    );

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec!["greta@example.com".to_string()]);
}

#[tokio::test]
async fn test_reminders_in_the_past_are_skipped() {
    let h = Harness::new();
    let details = h.event(None, Duration::minutes(30));
    let user = h.user("Late");

    let created = h
        .triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].notification_type, NotificationType::RsvpConfirmation);
}

#[tokio::test]
async fn test_non_going_confirmation_has_no_reminders() {
    let h = Harness::new();
    let details = h.event(None, Duration::days(2));
    let user = h.user("Ines");

    let created = h
        .triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Interested)
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
}

#[tokio::test]
async fn test_failed_immediate_delivery_does_not_fail_trigger() {
    let h = Harness::with(
        gatherly_rsvp::mocks::RecordingChannel::failing(1),
        gatherly_rsvp::NotificationConfig::default(),
    );
    let details = h.event(None, Duration::days(2));
    let user = h.user("Otto");

    let created = h
        .triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
        .await
        .unwrap();

    let stored = h.store.get(created[0].id).await.unwrap().unwrap();
    assert_eq!(stored.status, NotificationStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert!(stored.can_retry());
}

#[tokio::test]
async fn test_missing_event_creates_nothing() {
    let h = Harness::new();
    let user = h.user("Nobody");

    let err = h
        .triggers
        .on_rsvp_confirmation(gatherly_core::EventId::new(), user, RsvpStatus::Going)
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::EventNotFound(_)));
    assert!(err.is_not_found());
    assert!(h.store.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_group_creates_nothing() {
    let h = Harness::new();
    let details = h.event(None, Duration::days(2));

    let err = h
        .triggers
        .on_new_group_event(details.id(), GroupId::new())
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::GroupNotFound(_)));
    assert!(h.store.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_group_invite_carries_token_and_role() {
    let h = Harness::new();
    let inviter = h.user("Iris");
    let invitee = h.user("Ivan");
    let group = h.group("Choir", &[inviter]);

    let notification = h
        .triggers
        .on_group_invite(group, invitee, inviter, GroupRole::Admin, "inv_42")
        .await
        .unwrap();

    assert_eq!(notification.user_id, invitee);
    match notification.payload {
        NotificationPayload::GroupInvite(p) => {
            assert_eq!(p.invite_token, "inv_42");
            assert_eq!(p.role, GroupRole::Admin);
            assert_eq!(p.inviter_name, "Iris");
            assert_eq!(p.group_name, "Choir");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn test_group_invite_unknown_invitee() {
    let h = Harness::new();
    let inviter = h.user("Iris");
    let group = h.group("Choir", &[inviter]);
    let stranger = UserId::new();

    let err = h
        .triggers
        .on_group_invite(group, stranger, inviter, GroupRole::Member, "inv_1")
        .await
        .unwrap_err();

    assert_eq!(err, NotifyError::UserNotFound(stranger));
}

#[tokio::test]
async fn test_user_notifications_round_trip() {
    let h = Harness::new();
    let details = h.event(Some(5), Duration::days(7));
    let user = h.user("Rita");

    let created = h
        .triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
        .await
        .unwrap();

    let fetched = h.store.get_user_notifications(user, 10, 0).await.unwrap();
    assert_eq!(fetched.len(), created.len());

    for original in &created {
        let stored = fetched.iter().find(|n| n.id == original.id).unwrap();
        assert_eq!(stored.notification_type, original.notification_type);
        assert_eq!(stored.payload, original.payload);
        let expected_status = if original.notification_type == NotificationType::EventReminder {
            NotificationStatus::Pending
        } else {
            NotificationStatus::Sent
        };
        assert_eq!(stored.status, expected_status);
    }

    let page = h.store.get_user_notifications(user, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_repeated_going_confirmation_replaces_reminders() {
    let h = Harness::new();
    let details = h.event(None, Duration::days(7));
    let user = h.user("Noor");

    for _ in 0..2 {
        h.triggers
            .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
            .await
            .unwrap();
    }

    let pending: Vec<_> = h
        .store
        .get_pending_reminders(details.id(), user)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
}

#[tokio::test]
async fn test_cancel_pending_reminders() {
    let h = Harness::new();
    let details = h.event(None, Duration::days(7));
    let user = h.user("Cleo");

    h.triggers
        .on_rsvp_confirmation(details.id(), user, RsvpStatus::Going)
        .await
        .unwrap();

    let cancelled = h
        .triggers
        .cancel_pending_reminders(details.id(), user)
        .await
        .unwrap();
    assert_eq!(cancelled, 2);

    let statuses: Vec<NotificationStatus> = h
        .store
        .all()
        .unwrap()
        .into_iter()
        .filter(|n| n.notification_type == NotificationType::EventReminder)
        .map(|n| n.status)
        .collect();
    assert_eq!(statuses, vec![NotificationStatus::Cancelled; 2]);

    let again = h
        .triggers
        .cancel_pending_reminders(details.id(), user)
        .await
        .unwrap();
    assert_eq!(again, 0);
}
