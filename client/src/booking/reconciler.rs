//! Booking list with optimistic cancellation and pending-payment polling.
//!
//! The list is a client cache of the server's booking set. Display
//! categories (upcoming / active / completed / cancelled) are derived from
//! dates on every read and never persisted. Cancellation applies
//! optimistically so the row flips immediately; a rejected cancel discards
//! the optimistic copy and refetches the authoritative list rather than
//! merging. While any pay-online booking has a pending payment, a
//! self-rescheduling poll tick checks payment statuses until none remain.

use crate::api::BookingApi;
use crate::error::ApiFailure;
use crate::types::{Booking, BookingCategory, BookingId, CancelledBy, PaymentStatus};
use chrono::NaiveDate;
use concierge_core::{effect::Effect, environment::Clock, reducer::Reducer};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Derived categorization
// ============================================================================

/// Classify a booking relative to `today` (day granularity)
///
/// Total: every booking lands in exactly one category. Cancellation takes
/// precedence over any date arithmetic.
#[must_use]
pub fn categorize(booking: &Booking, today: NaiveDate) -> BookingCategory {
    if booking.is_cancelled() {
        BookingCategory::Cancelled
    } else if booking.check_out_date < today {
        BookingCategory::Completed
    } else if booking.check_in_date <= today {
        BookingCategory::Active
    } else {
        BookingCategory::Upcoming
    }
}

/// Bookings partitioned by derived category, in list order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorizedBookings {
    /// Check-in in the future
    pub upcoming: Vec<Booking>,
    /// Today falls within the stay
    pub active: Vec<Booking>,
    /// Check-out has passed
    pub completed: Vec<Booking>,
    /// Explicitly cancelled
    pub cancelled: Vec<Booking>,
}

impl CategorizedBookings {
    /// Partition `bookings` by category relative to `today`
    #[must_use]
    pub fn partition(bookings: &[Booking], today: NaiveDate) -> Self {
        let mut partitioned = Self::default();
        for booking in bookings {
            let bucket = match categorize(booking, today) {
                BookingCategory::Upcoming => &mut partitioned.upcoming,
                BookingCategory::Active => &mut partitioned.active,
                BookingCategory::Completed => &mut partitioned.completed,
                BookingCategory::Cancelled => &mut partitioned.cancelled,
            };
            bucket.push(booking.clone());
        }
        partitioned
    }
}

// ============================================================================
// State
// ============================================================================

/// Cached booking list plus poll bookkeeping
#[derive(Clone, Debug, Default)]
pub struct BookingListState {
    /// Cached bookings, server order
    pub bookings: Vec<Booking>,
    /// True while a list fetch is in flight
    pub refreshing: bool,
    /// True while the pending-payment poll loop is armed
    pub polling: bool,
    /// Poll loop generation; ticks from older generations are dropped
    pub poll_generation: u64,
    /// Human-readable notice for the UI
    pub notice: Option<String>,
    /// Set when the server rejected the credential; forces sign-out
    pub auth_expired: bool,
}

impl BookingListState {
    /// The cached list partitioned by derived category
    #[must_use]
    pub fn categorized(&self, today: NaiveDate) -> CategorizedBookings {
        CategorizedBookings::partition(&self.bookings, today)
    }

    /// Bookings that qualify for the pending-payment poll
    fn pending_payment_ids(&self) -> Vec<BookingId> {
        self.bookings
            .iter()
            .filter(|b| b.has_pending_online_payment())
            .map(|b| b.id)
            .collect()
    }

    fn booking_mut(&mut self, booking_id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == booking_id)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the booking list
#[derive(Clone, Debug)]
pub enum BookingListAction {
    /// Intent: fetch the authoritative list
    Refresh,
    /// Response: fetch succeeded; the cache is replaced wholesale
    Loaded {
        /// Authoritative bookings
        bookings: Vec<Booking>,
    },
    /// Response: fetch failed
    LoadFailed {
        /// Failure summary
        failure: ApiFailure,
    },
    /// Intent: cancel a booking (optimistic)
    Cancel {
        /// Booking to cancel
        booking_id: BookingId,
        /// Reason recorded server-side
        reason: String,
    },
    /// Response: server confirmed the cancellation
    CancelConfirmed {
        /// Cancelled booking
        booking_id: BookingId,
        /// Authoritative record when the server returned one
        booking: Option<Box<Booking>>,
    },
    /// Response: server rejected the cancellation; discard and refetch
    CancelRejected {
        /// Booking whose optimistic copy is discarded
        booking_id: BookingId,
        /// Failure summary
        failure: ApiFailure,
    },
    /// Timer: one iteration of the pending-payment poll loop
    PollTick {
        /// Generation this tick belongs to
        generation: u64,
    },
    /// Response: one booking's payment status came back
    PaymentStatusChecked {
        /// Booking checked
        booking_id: BookingId,
        /// Authoritative status
        status: PaymentStatus,
    },
    /// Response: one payment-status check failed (best effort, logged)
    PaymentStatusCheckFailed {
        /// Booking checked
        booking_id: BookingId,
        /// Failure detail
        message: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies for the booking list
#[derive(Clone)]
pub struct BookingListEnvironment {
    /// REST client
    pub api: Arc<dyn BookingApi>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Interval between pending-payment poll ticks
    pub poll_interval: Duration,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer keeping the cached list reconciled with the server
#[derive(Clone, Debug, Default)]
pub struct BookingListReducer;

impl Reducer for BookingListReducer {
    type State = BookingListState;
    type Action = BookingListAction;
    type Environment = BookingListEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per list transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Vec<Effect<Self::Action>> {
        match action {
            BookingListAction::Refresh => {
                if state.refreshing {
                    tracing::debug!("refresh already in flight; ignoring");
                    return vec![Effect::None];
                }
                state.refreshing = true;
                vec![load_effect(env)]
            },

            BookingListAction::Loaded { bookings } => {
                state.refreshing = false;
                state.bookings = bookings;

                // Arm the poll loop when pending online payments appear;
                // disarm it when none remain.
                let has_pending = !state.pending_payment_ids().is_empty();
                if has_pending && !state.polling {
                    state.polling = true;
                    state.poll_generation += 1;
                    tracing::debug!(
                        generation = state.poll_generation,
                        "pending-payment poll armed"
                    );
                    return vec![poll_timer(state.poll_generation, env.poll_interval)];
                }
                if !has_pending && state.polling {
                    state.polling = false;
                    tracing::debug!("pending-payment poll disarmed");
                }
                vec![Effect::None]
            },

            BookingListAction::LoadFailed { failure } => {
                state.refreshing = false;
                state.notice = Some(failure.message.clone());
                state.auth_expired |= failure.auth;
                tracing::warn!(message = %failure.message, "booking list fetch failed");
                vec![Effect::None]
            },

            BookingListAction::Cancel { booking_id, reason } => {
                let now = env.clock.now();
                let Some(booking) = state.booking_mut(booking_id) else {
                    tracing::debug!(%booking_id, "cancel for unknown booking; ignoring");
                    return vec![Effect::None];
                };
                if booking.is_cancelled() {
                    tracing::debug!(%booking_id, "already cancelled; ignoring");
                    return vec![Effect::None];
                }

                // Optimistic: the row flips immediately; the server call
                // reconciles or rolls the whole list back.
                booking.mark_cancelled(now, CancelledBy::User);

                let call = env.api.cancel_booking(booking_id, reason);
                vec![Effect::Future(Box::pin(async move {
                    Some(match call.await {
                        Ok(booking) => BookingListAction::CancelConfirmed {
                            booking_id,
                            booking: booking.map(Box::new),
                        },
                        Err(err) => BookingListAction::CancelRejected {
                            booking_id,
                            failure: ApiFailure::from_error(&err),
                        },
                    })
                }))]
            },

            BookingListAction::CancelConfirmed {
                booking_id,
                booking,
            } => {
                // Adopt the server's record wholesale when it returned one;
                // the optimistic copy is otherwise already correct enough.
                if let Some(authoritative) = booking {
                    if let Some(cached) = state.booking_mut(booking_id) {
                        *cached = *authoritative;
                    }
                }
                tracing::info!(%booking_id, "cancellation confirmed");
                vec![Effect::None]
            },

            BookingListAction::CancelRejected {
                booking_id,
                failure,
            } => {
                state.notice = Some(failure.message.clone());
                state.auth_expired |= failure.auth;
                tracing::warn!(%booking_id, message = %failure.message, "cancellation rejected; refetching");

                // Discard-and-refetch: never merge the optimistic copy back.
                state.refreshing = true;
                vec![load_effect(env)]
            },

            BookingListAction::PollTick { generation } => {
                if !state.polling || generation != state.poll_generation {
                    tracing::debug!(generation, "stale poll tick dropped");
                    return vec![Effect::None];
                }

                let pending = state.pending_payment_ids();
                if pending.is_empty() {
                    state.polling = false;
                    tracing::debug!("pending-payment poll disarmed");
                    return vec![Effect::None];
                }

                // Best-effort fan-out, then reschedule the same generation.
                let checks = pending
                    .into_iter()
                    .map(|booking_id| {
                        let call = env.api.payment_status(booking_id);
                        Effect::Future(Box::pin(async move {
                            Some(match call.await {
                                Ok(status) => BookingListAction::PaymentStatusChecked {
                                    booking_id,
                                    status,
                                },
                                Err(err) => BookingListAction::PaymentStatusCheckFailed {
                                    booking_id,
                                    message: err.to_string(),
                                },
                            })
                        }))
                    })
                    .collect();

                vec![
                    Effect::Parallel(checks),
                    poll_timer(generation, env.poll_interval),
                ]
            },

            BookingListAction::PaymentStatusChecked { booking_id, status } => {
                let Some(booking) = state.booking_mut(booking_id) else {
                    return vec![Effect::None];
                };
                booking.record_payment_status(status);

                if status == PaymentStatus::Completed {
                    tracing::info!(%booking_id, "pending payment completed; resyncing list");
                    if !state.refreshing {
                        state.refreshing = true;
                        return vec![load_effect(env)];
                    }
                }
                vec![Effect::None]
            },

            BookingListAction::PaymentStatusCheckFailed {
                booking_id,
                message,
            } => {
                // Best effort: the next tick tries again.
                tracing::debug!(%booking_id, %message, "payment status check failed");
                vec![Effect::None]
            },
        }
    }
}

fn load_effect(env: &BookingListEnvironment) -> Effect<BookingListAction> {
    let call = env.api.list_bookings(None);
    Effect::Future(Box::pin(async move {
        Some(match call.await {
            Ok(bookings) => BookingListAction::Loaded { bookings },
            Err(err) => BookingListAction::LoadFailed {
                failure: ApiFailure::from_error(&err),
            },
        })
    }))
}

fn poll_timer(generation: u64, interval: Duration) -> Effect<BookingListAction> {
    Effect::Delay {
        duration: interval,
        action: Box::new(BookingListAction::PollTick { generation }),
    }
}
