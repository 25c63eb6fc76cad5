//! Property tests for the notification feed.
//!
//! Pushed events arrive at-least-once and in any order; the feed must
//! keep the unread counter exactly equal to the number of unread items
//! after every single event, no matter the sequence.

#![allow(clippy::unwrap_used)] // Test assertions can use unwrap

use chrono::Utc;
use concierge_client::api::MockBookingApi;
use concierge_client::notifications::store::{
    NotificationAction, NotificationFeedEnvironment, NotificationFeedReducer,
    NotificationFeedState,
};
use concierge_client::types::{Notification, NotificationId, NotificationKind};
use concierge_core::reducer::Reducer;
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

const POOL: usize = 8;

fn id(index: usize) -> NotificationId {
    NotificationId::from_uuid(Uuid::from_u128(index as u128 + 1))
}

fn item(index: usize, read: bool) -> Notification {
    Notification {
        id: id(index),
        kind: NotificationKind::Booking,
        title: format!("notification {index}"),
        message: "body".to_string(),
        link: None,
        read,
        created_at: Utc::now(),
    }
}

#[derive(Debug, Clone)]
enum Event {
    Push(usize, bool),
    Read(usize),
    AllRead,
    Delete(usize),
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0..POOL, any::<bool>()).prop_map(|(i, read)| Event::Push(i, read)),
        (0..POOL).prop_map(Event::Read),
        Just(Event::AllRead),
        (0..POOL).prop_map(Event::Delete),
    ]
}

proptest! {
    /// Any at-least-once event sequence keeps the counter exact and
    /// non-negative, and never creates duplicate items.
    #[test]
    fn unread_count_always_matches_unread_items(
        events in prop::collection::vec(event_strategy(), 0..64)
    ) {
        let reducer = NotificationFeedReducer;
        let env = NotificationFeedEnvironment {
            api: Arc::new(MockBookingApi::new()),
        };
        let mut state = NotificationFeedState::default();

        for event in events {
            let action = match event {
                Event::Push(i, read) => NotificationAction::Pushed {
                    notification: Box::new(item(i, read)),
                },
                Event::Read(i) => NotificationAction::ReadPushed { id: id(i) },
                Event::AllRead => NotificationAction::AllReadPushed,
                Event::Delete(i) => NotificationAction::DeletedPushed { id: id(i) },
            };
            reducer.reduce(&mut state, action, &env);

            let unread = state.notifications.iter().filter(|n| !n.read).count();
            prop_assert_eq!(state.unread_count as usize, unread);

            let unique: std::collections::HashSet<_> =
                state.notifications.iter().map(|n| n.id).collect();
            prop_assert_eq!(unique.len(), state.notifications.len());
        }
    }
}
