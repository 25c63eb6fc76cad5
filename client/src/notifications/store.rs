//! Notification feed state and reducer.
//!
//! The feed is fed from two directions: a wholesale REST fetch and
//! incremental pushed events from the live channel. Pushed events arrive
//! at-least-once and possibly out of order, so every handler is
//! idempotent: a duplicate or stale event leaves the state unchanged. The
//! unread counter is kept exactly consistent with the items and can never
//! go negative.

use crate::api::BookingApi;
use crate::error::ApiFailure;
use crate::types::{Notification, NotificationId};
use concierge_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Notification feed: items newest-first plus the unread badge count
#[derive(Clone, Debug, Default)]
pub struct NotificationFeedState {
    /// Feed items, newest first
    pub notifications: Vec<Notification>,
    /// Unread badge count, always equal to the number of unread items
    pub unread_count: u32,
    /// True while a feed fetch is in flight
    pub fetching: bool,
    /// Human-readable notice for the UI
    pub notice: Option<String>,
    /// Set when the server rejected the credential; forces sign-out
    pub auth_expired: bool,
}

impl NotificationFeedState {
    fn contains(&self, id: NotificationId) -> bool {
        self.notifications.iter().any(|n| n.id == id)
    }

    fn notification_mut(&mut self, id: NotificationId) -> Option<&mut Notification> {
        self.notifications.iter_mut().find(|n| n.id == id)
    }

    fn recount(&mut self) {
        self.unread_count = u32::try_from(
            self.notifications.iter().filter(|n| !n.read).count(),
        )
        .unwrap_or(u32::MAX);
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the notification feed: REST intents plus pushed events
#[derive(Clone, Debug)]
pub enum NotificationAction {
    /// Intent: fetch the whole feed
    FetchAll,
    /// Response: fetch succeeded; the feed is replaced wholesale
    Fetched {
        /// Authoritative feed, newest first
        notifications: Vec<Notification>,
    },
    /// Response: fetch failed
    FetchFailed {
        /// Failure summary
        failure: ApiFailure,
    },
    /// Pushed: a new notification arrived on the live channel
    Pushed {
        /// The new item (duplicate ids are dropped)
        notification: Box<Notification>,
    },
    /// Pushed: a notification was read on another device
    ReadPushed {
        /// Item read elsewhere
        id: NotificationId,
    },
    /// Pushed: the whole feed was read on another device
    AllReadPushed,
    /// Pushed: a notification was deleted server-side
    DeletedPushed {
        /// Item removed
        id: NotificationId,
    },
    /// Intent: mark one notification read (optimistic)
    MarkAsRead {
        /// Item to mark
        id: NotificationId,
    },
    /// Intent: mark the whole feed read (optimistic)
    MarkAllAsRead,
    /// Response: a mark-read call failed (logged, not rolled back)
    MarkFailed {
        /// Failure detail
        message: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies for the notification feed
#[derive(Clone)]
pub struct NotificationFeedEnvironment {
    /// REST client
    pub api: Arc<dyn BookingApi>,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer keeping the feed idempotent under at-least-once delivery
#[derive(Clone, Debug, Default)]
pub struct NotificationFeedReducer;

impl Reducer for NotificationFeedReducer {
    type State = NotificationFeedState;
    type Action = NotificationAction;
    type Environment = NotificationFeedEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Vec<Effect<Self::Action>> {
        match action {
            NotificationAction::FetchAll => {
                if state.fetching {
                    return vec![Effect::None];
                }
                state.fetching = true;

                let call = env.api.fetch_notifications();
                vec![Effect::Future(Box::pin(async move {
                    Some(match call.await {
                        Ok(notifications) => NotificationAction::Fetched { notifications },
                        Err(err) => NotificationAction::FetchFailed {
                            failure: ApiFailure::from_error(&err),
                        },
                    })
                }))]
            },

            NotificationAction::Fetched { notifications } => {
                state.fetching = false;
                state.notifications = notifications;
                state.recount();
                vec![Effect::None]
            },

            NotificationAction::FetchFailed { failure } => {
                state.fetching = false;
                state.notice = Some(failure.message.clone());
                state.auth_expired |= failure.auth;
                tracing::warn!(message = %failure.message, "notification fetch failed");
                vec![Effect::None]
            },

            NotificationAction::Pushed { notification } => {
                // At-least-once delivery: a redelivered id is a no-op.
                if state.contains(notification.id) {
                    tracing::debug!(id = %notification.id, "duplicate notification dropped");
                    return vec![Effect::None];
                }
                if !notification.read {
                    state.unread_count = state.unread_count.saturating_add(1);
                }
                state.notifications.insert(0, *notification);
                vec![Effect::None]
            },

            NotificationAction::ReadPushed { id } => {
                if let Some(notification) = state.notification_mut(id) {
                    if !notification.read {
                        notification.read = true;
                        state.unread_count = state.unread_count.saturating_sub(1);
                    }
                }
                vec![Effect::None]
            },

            NotificationAction::AllReadPushed => {
                for notification in &mut state.notifications {
                    notification.read = true;
                }
                state.unread_count = 0;
                vec![Effect::None]
            },

            NotificationAction::DeletedPushed { id } => {
                if let Some(index) = state.notifications.iter().position(|n| n.id == id) {
                    let removed = state.notifications.remove(index);
                    if !removed.read {
                        state.unread_count = state.unread_count.saturating_sub(1);
                    }
                }
                vec![Effect::None]
            },

            NotificationAction::MarkAsRead { id } => {
                let Some(notification) = state.notification_mut(id) else {
                    return vec![Effect::None];
                };
                if notification.read {
                    return vec![Effect::None];
                }

                // Optimistic: the badge drops immediately. A failed call is
                // logged and left for the next fetch to resync.
                notification.read = true;
                state.unread_count = state.unread_count.saturating_sub(1);

                let call = env.api.mark_notification_read(id);
                vec![Effect::Future(Box::pin(async move {
                    match call.await {
                        Ok(()) => None,
                        Err(err) => Some(NotificationAction::MarkFailed {
                            message: err.to_string(),
                        }),
                    }
                }))]
            },

            NotificationAction::MarkAllAsRead => {
                if state.unread_count == 0 {
                    return vec![Effect::None];
                }
                for notification in &mut state.notifications {
                    notification.read = true;
                }
                state.unread_count = 0;

                let call = env.api.mark_all_notifications_read();
                vec![Effect::Future(Box::pin(async move {
                    match call.await {
                        Ok(()) => None,
                        Err(err) => Some(NotificationAction::MarkFailed {
                            message: err.to_string(),
                        }),
                    }
                }))]
            },

            NotificationAction::MarkFailed { message } => {
                // Not rolled back: the server wins at the next fetch.
                tracing::warn!(%message, "mark-read call failed");
                vec![Effect::None]
            },
        }
    }
}
