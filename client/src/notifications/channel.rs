//! Live notification channel.
//!
//! Maintains a WebSocket connection to the notification stream for the
//! lifetime of the session: connect, authenticate, then translate pushed
//! frames into [`NotificationAction`]s dispatched to the feed store. On
//! any disconnect the channel reconnects with exponential backoff
//! (resetting after a successful authentication) until the session is
//! invalidated. Unknown frame types are skipped so old clients survive
//! new server events.

use crate::config::ChannelConfig;
use crate::notifications::store::{
    NotificationAction, NotificationFeedEnvironment, NotificationFeedReducer,
    NotificationFeedState,
};
use crate::session::Session;
use crate::types::{Notification, NotificationId};
use concierge_runtime::Store;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use uuid::Uuid;

/// Store type for the notification feed
pub type NotificationStore = Store<
    NotificationFeedState,
    NotificationAction,
    NotificationFeedEnvironment,
    NotificationFeedReducer,
>;

/// Connection lifecycle of the live channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No connection
    #[default]
    Disconnected,
    /// TCP/TLS and WebSocket handshake in progress
    Connecting,
    /// Socket open, authenticate frame sent, awaiting the ack
    Authenticating,
    /// Authenticated and receiving events
    Streaming,
}

// ============================================================================
// Wire frames
// ============================================================================

/// Frames sent by the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    /// First frame on every connection
    Authenticate { user_id: Uuid },
}

/// Frames pushed by the server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    /// Authentication acknowledged; events follow
    Authenticated {
        #[allow(dead_code)]
        user_id: Uuid,
    },
    /// A new notification was created
    NewNotification { notification: Notification },
    /// A notification was read (possibly on another device)
    NotificationRead { id: NotificationId },
    /// The whole feed was read
    AllNotificationsRead,
    /// A notification was deleted server-side
    NotificationDeleted { id: NotificationId },
    /// Server-reported channel error
    Error { message: String },
}

impl ServerFrame {
    /// Translate a pushed frame into a feed action, when it carries one
    fn into_action(self) -> Option<NotificationAction> {
        match self {
            Self::NewNotification { notification } => Some(NotificationAction::Pushed {
                notification: Box::new(notification),
            }),
            Self::NotificationRead { id } => Some(NotificationAction::ReadPushed { id }),
            Self::AllNotificationsRead => Some(NotificationAction::AllReadPushed),
            Self::NotificationDeleted { id } => Some(NotificationAction::DeletedPushed { id }),
            Self::Authenticated { .. } | Self::Error { .. } => None,
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Long-lived notification channel bound to one session
pub struct NotificationChannel {
    config: ChannelConfig,
    session: Session,
    state_tx: watch::Sender<ChannelState>,
}

impl NotificationChannel {
    /// Create a channel for one session (not yet connected)
    #[must_use]
    pub fn new(config: ChannelConfig, session: Session) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            config,
            session,
            state_tx,
        }
    }

    /// Observe the connection lifecycle
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Run the channel until the session is invalidated
    ///
    /// Spawns the reconnect loop; every pushed event is dispatched to
    /// `store`. The task ends (and reports `Disconnected`) when the
    /// session dies.
    pub fn spawn(self, store: NotificationStore) -> JoinHandle<()> {
        tokio::spawn(async move {
            let initial = self.config.reconnect_initial();
            let max = self.config.reconnect_max();
            let mut backoff = initial;

            while self.session.is_alive() {
                self.set_state(ChannelState::Connecting);

                match self.run_connection(&store).await {
                    Ok(ConnectionEnd::Authenticated) => {
                        // A connection that got as far as streaming resets
                        // the backoff.
                        backoff = initial;
                    },
                    Ok(ConnectionEnd::BeforeAuthentication) | Err(_) => {},
                }

                self.set_state(ChannelState::Disconnected);
                if !self.session.is_alive() {
                    break;
                }

                tracing::debug!(?backoff, "reconnecting");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max);
            }

            self.set_state(ChannelState::Disconnected);
            tracing::info!("notification channel stopped");
        })
    }

    /// One connect-authenticate-stream cycle
    async fn run_connection(&self, store: &NotificationStore) -> ChannelResult<ConnectionEnd> {
        let mut request = self.config.ws_url.as_str().into_client_request()?;
        request.headers_mut().insert(
            AUTHORIZATION,
            format!("Bearer {}", self.session.bearer_token()).parse()?,
        );

        let (ws, _) = connect_async(request).await?;
        let (mut write, mut read) = ws.split();

        // First frame on every connection: authenticate, then wait for the
        // ack before treating the stream as live.
        let auth = serde_json::to_string(&ClientFrame::Authenticate {
            user_id: self.session.user_id(),
        })?;
        write.send(Message::Text(auth)).await?;
        self.set_state(ChannelState::Authenticating);

        let mut authenticated = false;
        while let Some(message) = read.next().await {
            if !self.session.is_alive() {
                let _ = write.send(Message::Close(None)).await;
                break;
            }

            match message? {
                Message::Text(text) => {
                    let frame: ServerFrame = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(err) => {
                            // Unknown event types from newer servers
                            tracing::debug!(error = %err, "skipping unrecognized frame");
                            continue;
                        },
                    };

                    match frame {
                        ServerFrame::Authenticated { .. } => {
                            authenticated = true;
                            self.set_state(ChannelState::Streaming);
                            tracing::info!("notification channel streaming");
                        },
                        ServerFrame::Error { ref message } => {
                            tracing::warn!(%message, "server reported channel error");
                        },
                        other => {
                            if let Some(action) = other.into_action() {
                                if store.send(action).await.is_err() {
                                    // Store shut down; stop streaming.
                                    let _ = write.send(Message::Close(None)).await;
                                    break;
                                }
                            }
                        },
                    }
                },
                Message::Ping(payload) => {
                    write.send(Message::Pong(payload)).await?;
                },
                Message::Close(_) => break,
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {},
            }
        }

        Ok(if authenticated {
            ConnectionEnd::Authenticated
        } else {
            ConnectionEnd::BeforeAuthentication
        })
    }

    fn set_state(&self, state: ChannelState) {
        let _ = self.state_tx.send(state);
    }
}

/// How far a connection got before it ended
enum ConnectionEnd {
    /// The stream was live; reset the backoff
    Authenticated,
    /// Dropped before the authentication ack
    BeforeAuthentication,
}

type ChannelResult<T> = Result<T, ChannelError>;

/// Connection-attempt failure, folded into the reconnect loop
#[derive(Debug, thiserror::Error)]
enum ChannelError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    #[error("frame encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::types::NotificationKind;

    #[test]
    fn new_notification_frame_becomes_pushed_action() {
        let json = serde_json::json!({
            "type": "new_notification",
            "notification": {
                "id": Uuid::new_v4(),
                "type": "BOOKING",
                "title": "Booking confirmed",
                "message": "See you soon",
                "read": false,
                "createdAt": Utc::now(),
            }
        });

        let frame: ServerFrame =
            serde_json::from_value(json).unwrap_or(ServerFrame::AllNotificationsRead);
        assert!(matches!(
            frame.into_action(),
            Some(NotificationAction::Pushed { .. })
        ));
    }

    #[test]
    fn unknown_frame_type_fails_parse_and_is_skippable() {
        let json = r#"{"type":"somethingNew","payload":{}}"#;
        let parsed: Result<ServerFrame, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn authenticate_frame_uses_the_wire_shape() {
        let user_id = Uuid::new_v4();
        let frame = serde_json::to_value(ClientFrame::Authenticate { user_id })
            .unwrap_or_default();
        assert_eq!(frame["type"], "authenticate");
        assert_eq!(frame["user_id"], serde_json::json!(user_id));
    }

    #[test]
    fn read_and_deleted_frames_map_to_idempotent_actions() {
        let id = NotificationId::new();
        let read = ServerFrame::NotificationRead { id };
        let deleted = ServerFrame::NotificationDeleted { id };

        assert!(matches!(
            read.into_action(),
            Some(NotificationAction::ReadPushed { .. })
        ));
        assert!(matches!(
            deleted.into_action(),
            Some(NotificationAction::DeletedPushed { .. })
        ));
    }

    #[test]
    fn kind_survives_unknown_values() {
        // Forward compatibility at the payload level too
        let json = r#""SOMETHING_ELSE""#;
        let kind: NotificationKind = serde_json::from_str(json).unwrap_or(NotificationKind::Other);
        assert_eq!(kind, NotificationKind::Other);
    }
}
