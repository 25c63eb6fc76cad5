//! # Concierge Testing
//!
//! Testing utilities and helpers for the Concierge booking engine.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations ([`FixedClock`],
//!   [`SteppingClock`])
//! - The [`ReducerTest`] given/when/then harness
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use concierge_testing::test_clock;
//! use concierge_runtime::Store;
//!
//! #[tokio::test]
//! async fn cancel_marks_booking_optimistically() {
//!     let env = test_environment();
//!     let store = Store::new(BookingListState::default(), BookingListReducer, env);
//!
//!     store.send(BookingListAction::Cancel {
//!         booking_id,
//!         reason: "plans changed".into(),
//!     }).await?;
//!
//!     let cancelled = store.state(|s| s.booking(booking_id).is_cancelled()).await;
//!     assert!(cancelled);
//! }
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use concierge_core::environment::Clock;


pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, TimeDelta, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use concierge_testing::mocks::FixedClock;
    /// use concierge_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now()); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Manually advanced clock
    ///
    /// Starts at a fixed time and only moves when the test calls
    /// [`SteppingClock::advance`]. Used for window-based behavior (burst
    /// coalescing, settle windows, poll ticks) where the test must control
    /// how much time passed between two dispatches.
    #[derive(Debug)]
    pub struct SteppingClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        /// Create a stepping clock starting at the given time
        #[must_use]
        pub const fn new(start: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(start),
            }
        }

        /// Advance the clock by `delta`
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = match self.time.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *time += delta;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            match self.time.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, SteppingClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn stepping_clock_moves_on_advance() {
        let clock = SteppingClock::new(test_clock().now());
        let before = clock.now();
        clock.advance(TimeDelta::milliseconds(500));
        assert_eq!(clock.now() - before, TimeDelta::milliseconds(500));
    }
}
