//! Shared harness for the service integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use chrono::{DateTime, Duration, Utc};
use gatherly_core::{Event, GroupId, GroupRole, UserId};
use gatherly_rsvp::mocks::{
    self, InMemoryDirectory, InMemoryNotificationStore, MockEnvironment, RecordingChannel,
};
use gatherly_rsvp::providers::{
    AllowAll, EventDetails, Group, GroupMember, GroupWithMembers, UserProfile,
};
use gatherly_rsvp::{Dispatcher, NotificationConfig, RsvpService, TriggerService};
use gatherly_testing::{MutableClock, test_time};
use std::sync::Arc;

pub struct Harness {
    pub directory: InMemoryDirectory,
    pub store: InMemoryNotificationStore,
    pub channel: RecordingChannel,
    pub clock: MutableClock,
    pub dispatcher: Dispatcher<MockEnvironment>,
    pub triggers: TriggerService<MockEnvironment>,
    pub service: RsvpService<MockEnvironment>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingChannel::new(), NotificationConfig::default())
    }

    pub fn with(channel: RecordingChannel, config: NotificationConfig) -> Self {
        gatherly_testing::init_tracing();

        let directory = InMemoryDirectory::new();
        let store = InMemoryNotificationStore::new();
        let clock = MutableClock::new(test_time());
        let env = Arc::new(mocks::mock_environment(
            &directory,
            &store,
            &channel,
            AllowAll,
            Arc::new(clock.clone()),
        ));
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(Arc::clone(&env), Arc::clone(&config));
        let triggers = TriggerService::new(Arc::clone(&env), config, dispatcher.clone());
        let service = RsvpService::new(env, triggers.clone());

        Self {
            directory,
            store,
            channel,
            clock,
            dispatcher,
            triggers,
            service,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        gatherly_core::environment::Clock::now(&self.clock)
    }

    /// Register a user and return its ID.
    pub fn user(&self, name: &str) -> UserId {
        let user_id = UserId::new();
        self.directory
            .insert_user(UserProfile {
                user_id,
                display_name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .unwrap();
        user_id
    }

    /// Register an event starting `starts_in` from now.
    pub fn event(&self, capacity: Option<u32>, starts_in: Duration) -> EventDetails {
        let host = self.user("Host");
        let mut builder = Event::builder(host, "Sunset picnic", self.now() + starts_in);
        if let Some(c) = capacity {
            builder = builder.capacity(c);
        }
        self.register(builder.build())
    }

    pub fn register(&self, event: Event) -> EventDetails {
        let details = EventDetails {
            host: UserProfile {
                user_id: event.host_id,
                display_name: "Host".to_string(),
                email: "host@example.com".to_string(),
            },
            event,
            venue: None,
            group: None,
        };
        self.directory.insert_event(details.clone()).unwrap();
        details
    }

    /// Register a group with the given members (all `member` role).
    pub fn group(&self, name: &str, members: &[UserId]) -> GroupId {
        let id = GroupId::new();
        self.directory
            .insert_group(GroupWithMembers {
                group: Group {
                    id,
                    name: name.to_string(),
                },
                members: members
                    .iter()
                    .map(|user_id| GroupMember {
                        user_id: *user_id,
                        role: GroupRole::Member,
                    })
                    .collect(),
            })
            .unwrap();
        id
    }
}
