//! Authenticated session lifecycle.
//!
//! A [`Session`] is constructed explicitly at sign-in and invalidated at
//! sign-out (or when the server rejects the credential). Components receive
//! it by injection; nothing reads ambient global state. The notification
//! channel's reconnect loop observes the liveness flag and stops when the
//! session dies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// One signed-in guest session: identity plus bearer credential.
///
/// Cheap to clone; clones share the liveness flag, so invalidating any
/// clone (forced sign-out on an auth error) stops every component holding
/// one.
#[derive(Debug, Clone)]
pub struct Session {
    user_id: Uuid,
    bearer_token: String,
    alive: Arc<AtomicBool>,
}

impl Session {
    /// Create a session at sign-in
    #[must_use]
    pub fn new(user_id: Uuid, bearer_token: String) -> Self {
        Self {
            user_id,
            bearer_token,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The signed-in user's id
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// The bearer credential sent with every request
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    /// True until sign-out or forced invalidation
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Invalidate the session (sign-out or rejected credential)
    ///
    /// Idempotent. Reconnect loops and pollers observing this session stop
    /// at their next check.
    pub fn invalidate(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            tracing::info!(user_id = %self.user_id, "session invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_is_shared_across_clones() {
        let session = Session::new(Uuid::new_v4(), "token".to_string());
        let clone = session.clone();

        assert!(clone.is_alive());
        session.invalidate();
        assert!(!clone.is_alive());
    }
}
