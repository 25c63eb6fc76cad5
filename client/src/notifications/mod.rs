//! Notification feed and its live channel.
//!
//! The [`store`] holds the feed state with idempotent handlers for pushed
//! events; the [`channel`] maintains the authenticated WebSocket and
//! dispatches pushed frames into the store.

pub mod channel;
pub mod store;

pub use channel::{ChannelState, NotificationChannel, NotificationStore};
pub use store::{
    NotificationAction, NotificationFeedEnvironment, NotificationFeedReducer,
    NotificationFeedState,
};
