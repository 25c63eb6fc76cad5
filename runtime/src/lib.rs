//! # Concierge Runtime
//!
//! Runtime for the Concierge booking engine.
//!
//! This crate provides the [`Store`] that coordinates reducer execution and
//! effect handling for the client-held state machines (booking list,
//! payment sessions, notification feed).
//!
//! ## Core Components
//!
//! - **Store**: manages state, runs the reducer, executes effects
//! - **Effect executor**: runs effect descriptions and feeds produced
//!   actions back into the reducer
//! - **Action broadcast**: lets observers (UI bindings, tests) watch
//!   actions produced by effects
//! - **Rate limiter**: coalesces user-action bursts ([`rate_limit`])
//!
//! ## Example
//!
//! ```ignore
//! use concierge_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Dispatch an intent
//! store.send(BookingListAction::Refresh).await?;
//!
//! // Read derived state
//! let upcoming = store.state(|s| s.categorized(today).upcoming.len()).await;
//! ```

use concierge_core::{effect::Effect, reducer::Reducer};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

pub mod rate_limit;

pub use rate_limit::RateLimiter;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Timeout waiting for a terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// Typically means the store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// The Store - runtime for a reducer-driven state machine
///
/// Owns the state for one feature (one store per session per feature, per
/// the shared-resource policy: all mutations funnel through `send`). The
/// store is cheap to clone; clones share state, broadcast channel, and
/// effect accounting.
///
/// # Type Parameters
///
/// - `S`: state type
/// - `A`: action type
/// - `E`: environment type
/// - `R`: reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Action broadcast channel for observing actions produced by effects.
    ///
    /// Every action an effect feeds back into the store is also broadcast
    /// here, enabling request-response waits (`send_and_wait_for`) and
    /// UI observation without polling state.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// Action broadcast capacity defaults to 16; use
    /// [`Store::with_broadcast_capacity`] when many observers are attached.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a new store with a custom action broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action into the store
    ///
    /// Runs the reducer under the state write lock, then spawns the
    /// returned effects. Effects feed produced actions back via `send`,
    /// so a single user intent can drive a whole lifecycle (request →
    /// response → compensation) through this one entry point.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.received").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };

        for effect in effects {
            self.execute_effect(effect);
        }

        Ok(())
    }

    /// Send an action and wait for a matching result action
    ///
    /// Designed for request-response flows: subscribe to the action
    /// broadcast *before* sending (avoiding the race), send the initial
    /// action, and return the first effect-produced action matching the
    /// predicate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: timeout expired before a match
    /// - [`StoreError::ChannelClosed`]: broadcast closed (shutdown)
    /// - [`StoreError::ShutdownInProgress`]: store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();
        self.send(action).await?;

        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(candidate) if predicate(&candidate) => return Ok(candidate),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "action observer lagged; continuing");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }

    /// Subscribe to actions produced by effects
    ///
    /// Each subscriber receives every effect-produced action from the
    /// moment of subscription. Slow subscribers may lag and skip actions.
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read a value derived from the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Number of effects currently in flight
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    /// Initiate shutdown: stop accepting actions and wait for in-flight
    /// effects to drain, up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects were still running when
    /// the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.shutdown.store(true, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + timeout;
        while self.pending_effects.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                let remaining = self.pending_effects.load(Ordering::SeqCst);
                tracing::warn!(remaining, "shutdown timed out with effects still running");
                return Err(StoreError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Ok(())
    }

    /// Spawn a top-level effect onto the runtime
    fn execute_effect(&self, effect: Effect<A>) {
        if effect.is_none() {
            metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            return;
        }

        self.pending_effects.fetch_add(1, Ordering::SeqCst);
        let store = self.clone();

        tokio::spawn(async move {
            let _guard = PendingGuard(Arc::clone(&store.pending_effects));
            store.run_effect(effect).await;
        });
    }

    /// Run one effect to completion, feeding produced actions back
    ///
    /// Boxed for async recursion (Parallel/Sequential nest arbitrarily).
    fn run_effect(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    if let Some(action) = fut.await {
                        self.feed_back(action).await;
                    } else {
                        tracing::trace!("Effect::Future completed with no action");
                    }
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tokio::time::sleep(duration).await;
                    self.feed_back(*action).await;
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    let futures: Vec<_> = effects.into_iter().map(|e| self.run_effect(e)).collect();
                    futures::future::join_all(futures).await;
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    for effect in effects {
                        self.run_effect(effect).await;
                    }
                },
            }
        })
    }

    /// Broadcast an effect-produced action to observers and feed it back
    /// into the reducer.
    async fn feed_back(&self, action: A) {
        let _ = self.action_broadcast.send(action.clone());

        if let Err(err) = self.send(action).await {
            // During shutdown late feedback actions are dropped by design.
            tracing::debug!(error = %err, "dropping effect feedback action");
        }
    }
}

/// Decrements the pending-effect counter when the spawned task finishes,
/// including on panic unwinding.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
