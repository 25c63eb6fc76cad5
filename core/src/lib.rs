//! # Concierge Core
//!
//! Core traits and types for the Concierge booking engine.
//!
//! Concierge drives a guest-facing booking/payment lifecycle as a set of
//! client-held state machines. This crate provides the abstractions those
//! machines are built from:
//!
//! - **State**: domain state for one feature (the booking list, a payment
//!   session, the notification feed)
//! - **Action**: all possible inputs to a reducer (user intents, server
//!   responses, pushed events)
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Effect**: side-effect descriptions (not execution)
//! - **Environment**: injected dependencies via traits
//!
//! Reducers never perform I/O. Network calls, gateway confirmations, and
//! timers are described as [`effect::Effect`] values and executed by the
//! `Store` in `concierge-runtime`, which feeds resulting actions back into
//! the reducer.
//!
//! ## Example
//!
//! ```ignore
//! use concierge_core::{effect::Effect, reducer::Reducer};
//!
//! struct CancelReducer;
//!
//! impl Reducer for CancelReducer {
//!     type State = BookingListState;
//!     type Action = BookingListAction;
//!     type Environment = BookingListEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BookingListState,
//!         action: BookingListAction,
//!         env: &BookingListEnvironment,
//!     ) -> Vec<Effect<BookingListAction>> {
//!         // Mark the booking cancelled optimistically, then describe the
//!         // DELETE call as an Effect::Future.
//!         vec![]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Reducer module - the core trait for feature logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`.
/// All booking, payment, and notification logic lives in reducers so it can
/// be exercised deterministically in tests without a server or a socket.
pub mod reducer {
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for feature logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: the domain state this reducer operates on
    /// - `Action`: the action type this reducer processes
    /// - `Environment`: the injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the runtime
        ///
        /// State mutations applied here may be *optimistic*: applied before
        /// the server confirms, with a follow-up action reconciling or
        /// discarding them when the described effect resolves.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Vec<Effect<Self::Action>>;
    }
}

/// Effect module - side-effect descriptions
///
/// Effects are values, not execution. A reducer returns them and the Store
/// runtime runs them, feeding any produced action back into the reducer.
/// This keeps every suspension point (REST call, gateway confirmation,
/// poll timer) visible in the reducer's return value.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store
    /// runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: the action type that effects can produce (feedback loop)
    #[allow(missing_docs)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        ///
        /// Used for best-effort fan-out, e.g. polling the payment status of
        /// every pending online booking in one tick.
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially, each completing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (timers: poll ticks, settle windows)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if `Some`, the action is fed back
        /// into the reducer.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// True if this is `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies (the clock, the booking API, the payment
/// gateway) are abstracted behind traits and injected via the Environment
/// parameter of a reducer. Production wires real implementations; tests
/// wire deterministic mocks.
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Booking categorization compares calendar dates against "today", and
    /// the rate limiter compares action timestamps; both take time from an
    /// injected `Clock` so tests can pin it.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Get the current calendar date (day granularity)
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// System clock - production implementation backed by `Utc::now`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
