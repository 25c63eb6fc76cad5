//! # Concierge Client
//!
//! Client engine for the hotel booking and payment lifecycle.
//!
//! The engine runs as three cooperating stores (reducer + runtime from
//! `concierge-core` / `concierge-runtime`):
//!
//! - **Booking orchestrator** ([`booking::orchestrator`]): creation and
//!   the per-booking payment state machine (pay later, pay online with
//!   gateway confirmation, compensating revert on denial)
//! - **Booking list** ([`booking::reconciler`]): cached list with derived
//!   categorization, optimistic cancellation, and pending-payment polling
//! - **Notification feed** ([`notifications`]): REST-fetched feed kept
//!   live by an authenticated WebSocket with idempotent event handlers
//!
//! [`Concierge`] wires the three together for one signed-in session.
//!
//! ## Example
//!
//! ```ignore
//! use concierge_client::{Concierge, Config, Session};
//!
//! let config = Config::from_env();
//! let session = Session::new(user_id, bearer_token);
//! let client = Concierge::new(&config, session, gateway);
//! let tasks = client.start();
//!
//! client.flow().send(BookingFlowAction::CreateBooking { draft }).await?;
//! ```

pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notifications;
pub mod session;
pub mod types;

pub use booking::{BookingFlowStore, BookingListStore};
pub use config::Config;
pub use error::{ApiFailure, ClientError};
pub use gateway::{GatewayError, PaymentGateway};
pub use notifications::NotificationStore;
pub use session::Session;

use api::HttpBookingApi;
use booking::orchestrator::{
    BookingFlowAction, BookingFlowEnvironment, BookingFlowReducer, BookingFlowState,
};
use booking::reconciler::{
    BookingListAction, BookingListEnvironment, BookingListReducer, BookingListState,
};
use concierge_core::environment::SystemClock;
use concierge_runtime::{RateLimiter, Store};
use config::ChannelConfig;
use notifications::channel::NotificationChannel;
use notifications::store::{
    NotificationAction, NotificationFeedEnvironment, NotificationFeedReducer,
    NotificationFeedState,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handles for the engine's background tasks
#[derive(Debug)]
pub struct BackgroundTasks {
    /// The notification channel's reconnect loop
    pub channel: JoinHandle<()>,
    /// The orchestrator-to-list refresh forwarder
    pub refresh_forwarder: JoinHandle<()>,
    /// The auth sentinel forcing sign-out on a rejected credential
    pub auth_sentinel: JoinHandle<()>,
}

/// Invalidate the session on the first auth-flagged failure from any store
///
/// Every reducer renders a rejected credential as an auth-flagged
/// [`ApiFailure`] inside its failure action. This task watches the three
/// stores' action broadcasts and calls [`Session::invalidate`] on the
/// first such failure, which stops the notification channel's reconnect
/// loop and forces sign-out. The task ends after invalidation or when a
/// store shuts down.
pub fn spawn_auth_sentinel(
    flow: &BookingFlowStore,
    list: &BookingListStore,
    feed: &NotificationStore,
    session: Session,
) -> JoinHandle<()> {
    use tokio::sync::broadcast::error::RecvError;

    let mut flow_rx = flow.subscribe_actions();
    let mut list_rx = list.subscribe_actions();
    let mut feed_rx = feed.subscribe_actions();

    tokio::spawn(async move {
        loop {
            let rejected = tokio::select! {
                action = flow_rx.recv() => match action {
                    Ok(action) => flow_auth_rejected(&action),
                    Err(RecvError::Lagged(_)) => false,
                    Err(RecvError::Closed) => break,
                },
                action = list_rx.recv() => match action {
                    Ok(action) => list_auth_rejected(&action),
                    Err(RecvError::Lagged(_)) => false,
                    Err(RecvError::Closed) => break,
                },
                action = feed_rx.recv() => match action {
                    Ok(action) => feed_auth_rejected(&action),
                    Err(RecvError::Lagged(_)) => false,
                    Err(RecvError::Closed) => break,
                },
            };

            if rejected {
                tracing::warn!("credential rejected by the server; clearing session");
                session.invalidate();
                break;
            }
        }
    })
}

fn flow_auth_rejected(action: &BookingFlowAction) -> bool {
    matches!(
        action,
        BookingFlowAction::CreateFailed { failure }
            | BookingFlowAction::PaymentInitiationFailed { failure, .. }
            if failure.auth
    )
}

fn list_auth_rejected(action: &BookingListAction) -> bool {
    matches!(
        action,
        BookingListAction::LoadFailed { failure }
            | BookingListAction::CancelRejected { failure, .. }
            if failure.auth
    )
}

fn feed_auth_rejected(action: &NotificationAction) -> bool {
    matches!(
        action,
        NotificationAction::FetchFailed { failure } if failure.auth
    )
}

/// The assembled client engine for one signed-in session
pub struct Concierge {
    flow: BookingFlowStore,
    list: BookingListStore,
    feed: NotificationStore,
    channel_config: ChannelConfig,
    session: Session,
}

impl Concierge {
    /// Wire the three stores against the production API for `session`
    ///
    /// The payment gateway is injected; it wraps whatever card SDK the
    /// embedding application links.
    #[must_use]
    pub fn new(
        config: &Config,
        session: Session,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let api: Arc<dyn api::BookingApi> =
            Arc::new(HttpBookingApi::new(config.api.clone(), session.clone()));
        let clock = Arc::new(SystemClock);
        let limiter = Arc::new(RateLimiter::new(config.timing.debounce_window()));

        let flow = Store::new(
            BookingFlowState::default(),
            BookingFlowReducer,
            BookingFlowEnvironment {
                api: Arc::clone(&api),
                gateway,
                clock: clock.clone(),
                limiter,
                settle_window: config.timing.settle_window(),
            },
        );

        let list = Store::new(
            BookingListState::default(),
            BookingListReducer,
            BookingListEnvironment {
                api: Arc::clone(&api),
                clock,
                poll_interval: config.timing.poll_interval(),
            },
        );

        let feed = Store::new(
            NotificationFeedState::default(),
            NotificationFeedReducer,
            NotificationFeedEnvironment { api },
        );

        Self {
            flow,
            list,
            feed,
            channel_config: config.channel.clone(),
            session,
        }
    }

    /// Start the background tasks: the live channel, the refresh glue,
    /// and the auth sentinel
    #[must_use]
    pub fn start(&self) -> BackgroundTasks {
        let channel = NotificationChannel::new(self.channel_config.clone(), self.session.clone());
        BackgroundTasks {
            channel: channel.spawn(self.feed.clone()),
            refresh_forwarder: booking::spawn_refresh_forwarder(&self.flow, self.list.clone()),
            auth_sentinel: spawn_auth_sentinel(
                &self.flow,
                &self.list,
                &self.feed,
                self.session.clone(),
            ),
        }
    }

    /// The payment orchestrator store
    #[must_use]
    pub const fn flow(&self) -> &BookingFlowStore {
        &self.flow
    }

    /// The booking list store
    #[must_use]
    pub const fn list(&self) -> &BookingListStore {
        &self.list
    }

    /// The notification feed store
    #[must_use]
    pub const fn feed(&self) -> &NotificationStore {
        &self.feed
    }

    /// The session this engine is bound to
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Invalidate the session: stops the channel's reconnect loop at its
    /// next check and rejects further authenticated calls server-side.
    pub fn sign_out(&self) {
        self.session.invalidate();
    }
}
