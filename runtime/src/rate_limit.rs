//! Stateful rate limiting for user-initiated actions.
//!
//! UI surfaces can emit bursts of identical intents (double-clicks on
//! "pay online", rapid re-submits of the create form). The [`RateLimiter`]
//! coalesces a burst within a fixed window into exactly one admitted
//! action per key. It is scoped to a store's environment, not recreated
//! per dispatch, so the window survives across renders.
//!
//! Time is passed in by the caller (taken from the injected `Clock`), so
//! tests drive the limiter deterministically with a fixed clock.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Coalesces action bursts: at most one admission per key per window.
///
/// Admission is checked with [`RateLimiter::try_acquire`]; a rejected
/// attempt does not extend the window (the burst collapses onto the first
/// admission, it does not starve).
#[derive(Debug)]
pub struct RateLimiter {
    window: TimeDelta,
    last_admitted: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RateLimiter {
    /// Create a limiter with the given coalescing window
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            last_admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Try to admit an action for `key` at time `now`
    ///
    /// Returns `true` and records the admission if no admission for this
    /// key happened within the window; returns `false` otherwise.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut last = match self.last_admitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(admitted_at) = last.get(key) {
            if now.signed_duration_since(*admitted_at) < self.window {
                tracing::debug!(key, "action coalesced by rate limiter");
                return false;
            }
        }

        last.insert(key.to_string(), now);
        true
    }

    /// Forget the admission record for `key`
    ///
    /// Used when a flow terminates and the key will not recur (e.g. a
    /// booking left the payment lifecycle), keeping the map bounded.
    pub fn release(&self, key: &str) {
        let mut last = match self.last_admitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last.remove(key);
    }
}
