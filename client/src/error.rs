//! Error taxonomy for the booking client.
//!
//! Five failure classes with distinct propagation rules:
//!
//! - `Validation`: local, raised before any network call
//! - `Transport`: timeout or connectivity; state left unchanged
//! - `Auth`: credential rejected; the session must be cleared
//! - `Gateway`: payment denied; triggers the revert compensation
//! - `Server`: non-2xx or `success: false` envelope with a message

use crate::gateway::GatewayError;
use thiserror::Error;

/// Errors surfaced by the booking API client and the orchestration layer
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected locally, before any network call
    #[error("validation failed: {0}")]
    Validation(String),

    /// Timeout or connectivity failure
    #[error("network failure: {0}")]
    Transport(String),

    /// Credential missing, expired, or invalid; forces sign-out
    #[error("authentication rejected")]
    Auth,

    /// Payment gateway denied or failed the confirmation
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Server rejected the request
    #[error("server error: {message}")]
    Server {
        /// Human-readable message from the server envelope
        message: String,
    },
}

impl ClientError {
    /// True when the failure must clear the session
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Transport(err.to_string())
        } else {
            Self::Server {
                message: err.to_string(),
            }
        }
    }
}

/// Cloneable failure summary carried inside actions
///
/// Actions must be `Clone` for the store's broadcast channel, and
/// [`ClientError`] is not. Reducers receive this rendering instead: the
/// single human-readable notice plus the one distinction they act on
/// (auth failures clear the session).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiFailure {
    /// Human-readable notice for the user
    pub message: String,
    /// True when the session must be cleared
    pub auth: bool,
}

impl ApiFailure {
    /// Render a [`ClientError`] for transport inside an action
    #[must_use]
    pub fn from_error(err: &ClientError) -> Self {
        Self {
            message: err.to_string(),
            auth: err.is_auth(),
        }
    }
}

impl From<&ClientError> for ApiFailure {
    fn from(err: &ClientError) -> Self {
        Self::from_error(err)
    }
}
