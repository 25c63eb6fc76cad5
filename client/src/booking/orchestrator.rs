//! Per-booking payment state machine.
//!
//! Drives the pay-later / pay-online lifecycle:
//!
//! ```text
//! Idle ──[pay_later]──► booking created, flow terminal
//! Idle ──[pay_online]─► Requesting ─► AwaitingConfirmation ─► Submitting ─► Succeeded
//!                                                                └────────► Failed ─► revert compensation ─► Idle
//! ```
//!
//! A denied confirmation **always** triggers the compensating
//! revert-to-pay-later call before the error reaches the user; the
//! revert's own failure is logged and never masks the original gateway
//! error. Repeated pay-online intents are swallowed while a request or
//! submission is in flight, coalesced by the environment's rate limiter
//! within the debounce window, and blocked during the settle window after
//! any terminal phase.

use crate::api::{BookingApi, CreateBookingRequest};
use crate::error::ApiFailure;
use crate::gateway::PaymentGateway;
use crate::types::{BookingDraft, BookingId, ClientSecret};
use chrono::{DateTime, Utc};
use concierge_core::{effect::Effect, environment::Clock, reducer::Reducer};
use concierge_runtime::RateLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Limiter key for the create-booking intent
const CREATE_KEY: &str = "create-booking";

fn pay_key(booking_id: BookingId) -> String {
    format!("pay-online:{booking_id}")
}

// ============================================================================
// State
// ============================================================================

/// Ephemeral, client-held payment phase for one booking
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PaymentPhase {
    /// No payment flow in progress
    #[default]
    Idle,
    /// Pay-online initiation request in flight
    Requesting,
    /// Client secret received; waiting for the guest to confirm
    AwaitingConfirmation(ClientSecret),
    /// Gateway confirmation in flight
    Submitting(ClientSecret),
    /// Payment confirmed by the gateway
    Succeeded,
    /// Payment denied; compensation dispatched
    Failed,
}

impl PaymentPhase {
    /// True for phases with a call in flight (double-submission guard)
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Requesting | Self::Submitting(_))
    }

    /// True for terminal phases
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One booking's payment session
///
/// Created when the guest enters the online payment flow, destroyed after
/// the settle window following a terminal phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentSession {
    /// Current phase
    pub phase: PaymentPhase,
    /// End of the post-terminal settle window, while one is active
    pub settle_until: Option<DateTime<Utc>>,
}

impl PaymentSession {
    const fn new(phase: PaymentPhase) -> Self {
        Self {
            phase,
            settle_until: None,
        }
    }
}

/// Orchestrator state: payment sessions keyed per booking
#[derive(Clone, Debug, Default)]
pub struct BookingFlowState {
    /// Active payment sessions
    pub sessions: HashMap<BookingId, PaymentSession>,
    /// True while a create-booking call is in flight
    pub create_in_flight: bool,
    /// Booking created by the most recent successful create
    pub last_created: Option<BookingId>,
    /// Human-readable notice for the UI (one per failure path)
    pub notice: Option<String>,
    /// Set when the server rejected the credential; forces sign-out
    pub auth_expired: bool,
}

impl BookingFlowState {
    /// Current phase for a booking (`Idle` when no session exists)
    #[must_use]
    pub fn phase(&self, booking_id: BookingId) -> PaymentPhase {
        self.sessions
            .get(&booking_id)
            .map_or(PaymentPhase::Idle, |s| s.phase.clone())
    }

    /// True while the post-terminal settle window is open for a booking
    #[must_use]
    pub fn is_settling(&self, booking_id: BookingId, now: DateTime<Utc>) -> bool {
        self.sessions
            .get(&booking_id)
            .and_then(|s| s.settle_until)
            .is_some_and(|until| now < until)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the payment state machine: user intents plus the responses
/// effects feed back.
#[derive(Clone, Debug)]
pub enum BookingFlowAction {
    /// Intent: create a booking from a validated draft
    CreateBooking {
        /// Draft to submit
        draft: BookingDraft,
    },
    /// Response: booking created (client secret present for pay-online)
    BookingCreated {
        /// Server-assigned id
        booking_id: BookingId,
        /// Gateway handle when paying online
        client_secret: Option<ClientSecret>,
    },
    /// Response: creation failed
    CreateFailed {
        /// Failure summary
        failure: ApiFailure,
    },
    /// Intent: start online payment for an existing booking
    RequestOnlinePayment {
        /// Booking to pay
        booking_id: BookingId,
    },
    /// Response: pay-online initiation returned a client secret
    PaymentInitiated {
        /// Booking being paid
        booking_id: BookingId,
        /// Gateway handle for one confirmation attempt
        client_secret: ClientSecret,
    },
    /// Response: pay-online initiation failed
    PaymentInitiationFailed {
        /// Booking being paid
        booking_id: BookingId,
        /// Failure summary
        failure: ApiFailure,
    },
    /// Intent: confirm the pending payment through the gateway
    ConfirmPayment {
        /// Booking being paid
        booking_id: BookingId,
    },
    /// Response: gateway reported the literal succeeded status
    GatewayConfirmed {
        /// Booking paid
        booking_id: BookingId,
    },
    /// Response: gateway denied or failed the confirmation
    GatewayDenied {
        /// Booking whose payment failed
        booking_id: BookingId,
        /// The original gateway error, surfaced to the user
        message: String,
    },
    /// Response: revert-to-pay-later compensation succeeded
    RevertSucceeded {
        /// Reverted booking
        booking_id: BookingId,
    },
    /// Response: revert-to-pay-later compensation failed (logged only)
    RevertFailed {
        /// Booking left for the next resync
        booking_id: BookingId,
        /// Revert failure detail
        message: String,
    },
    /// Timer: the settle window after a terminal phase elapsed
    SettleElapsed {
        /// Booking whose session can be destroyed
        booking_id: BookingId,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies for the payment state machine
#[derive(Clone)]
pub struct BookingFlowEnvironment {
    /// REST client
    pub api: Arc<dyn BookingApi>,
    /// Card gateway bridge
    pub gateway: Arc<dyn PaymentGateway>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Burst coalescer shared across dispatches
    pub limiter: Arc<RateLimiter>,
    /// Settle window applied after terminal phases
    pub settle_window: Duration,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer driving the per-booking payment lifecycle
#[derive(Clone, Debug, Default)]
pub struct BookingFlowReducer;

impl Reducer for BookingFlowReducer {
    type State = BookingFlowState;
    type Action = BookingFlowAction;
    type Environment = BookingFlowEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per lifecycle transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Vec<Effect<Self::Action>> {
        match action {
            BookingFlowAction::CreateBooking { draft } => {
                if state.create_in_flight {
                    tracing::debug!("create already in flight; ignoring");
                    return vec![Effect::None];
                }

                // ValidationError blocks the action before any network call
                let request = match CreateBookingRequest::from_draft(&draft) {
                    Ok(request) => request,
                    Err(err) => {
                        state.notice = Some(err.to_string());
                        return vec![Effect::None];
                    },
                };

                if !env.limiter.try_acquire(CREATE_KEY, env.clock.now()) {
                    return vec![Effect::None];
                }

                state.create_in_flight = true;
                state.notice = None;

                let call = env.api.create_booking(request);
                vec![Effect::Future(Box::pin(async move {
                    Some(match call.await {
                        Ok(created) => BookingFlowAction::BookingCreated {
                            booking_id: created.booking_id,
                            client_secret: created.client_secret,
                        },
                        Err(err) => BookingFlowAction::CreateFailed {
                            failure: ApiFailure::from_error(&err),
                        },
                    })
                }))]
            },

            BookingFlowAction::BookingCreated {
                booking_id,
                client_secret,
            } => {
                state.create_in_flight = false;
                state.last_created = Some(booking_id);

                if let Some(secret) = client_secret {
                    tracing::info!(%booking_id, "booking created; awaiting payment confirmation");
                    state.sessions.insert(
                        booking_id,
                        PaymentSession::new(PaymentPhase::AwaitingConfirmation(secret)),
                    );
                } else {
                    tracing::info!(%booking_id, "booking created with pay-later");
                }
                vec![Effect::None]
            },

            BookingFlowAction::CreateFailed { failure } => {
                state.create_in_flight = false;
                state.notice = Some(failure.message.clone());
                state.auth_expired |= failure.auth;
                // The limiter key is not released: a fast failure followed by
                // a burst retry still coalesces within the window.
                tracing::warn!(message = %failure.message, "booking creation failed");
                vec![Effect::None]
            },

            BookingFlowAction::RequestOnlinePayment { booking_id } => {
                let now = env.clock.now();
                let phase = state.phase(booking_id);

                if phase.is_in_flight() || matches!(phase, PaymentPhase::AwaitingConfirmation(_)) {
                    tracing::debug!(%booking_id, "payment flow already active; ignoring");
                    return vec![Effect::None];
                }
                if state.is_settling(booking_id, now) {
                    tracing::debug!(%booking_id, "within settle window; ignoring");
                    return vec![Effect::None];
                }
                if !env.limiter.try_acquire(&pay_key(booking_id), now) {
                    return vec![Effect::None];
                }

                state
                    .sessions
                    .insert(booking_id, PaymentSession::new(PaymentPhase::Requesting));

                let call = env.api.pay_online(booking_id);
                vec![Effect::Future(Box::pin(async move {
                    Some(match call.await {
                        Ok(initiation) => BookingFlowAction::PaymentInitiated {
                            booking_id: initiation.booking_id,
                            client_secret: initiation.client_secret,
                        },
                        Err(err) => BookingFlowAction::PaymentInitiationFailed {
                            booking_id,
                            failure: ApiFailure::from_error(&err),
                        },
                    })
                }))]
            },

            BookingFlowAction::PaymentInitiated {
                booking_id,
                client_secret,
            } => {
                match state.sessions.get_mut(&booking_id) {
                    Some(session) if session.phase == PaymentPhase::Requesting => {
                        session.phase = PaymentPhase::AwaitingConfirmation(client_secret);
                    },
                    _ => {
                        tracing::warn!(%booking_id, "stale payment initiation; ignoring");
                    },
                }
                vec![Effect::None]
            },

            BookingFlowAction::PaymentInitiationFailed {
                booking_id,
                failure,
            } => {
                if state.phase(booking_id) == PaymentPhase::Requesting {
                    state.sessions.remove(&booking_id);
                }
                state.notice = Some(failure.message.clone());
                state.auth_expired |= failure.auth;
                tracing::warn!(%booking_id, message = %failure.message, "pay-online initiation failed");
                vec![Effect::None]
            },

            BookingFlowAction::ConfirmPayment { booking_id } => {
                let secret = match state.sessions.get_mut(&booking_id) {
                    Some(session) => {
                        if let PaymentPhase::AwaitingConfirmation(secret) = session.phase.clone() {
                            session.phase = PaymentPhase::Submitting(secret.clone());
                            secret
                        } else {
                            tracing::debug!(%booking_id, "no confirmable payment; ignoring");
                            return vec![Effect::None];
                        }
                    },
                    None => {
                        tracing::debug!(%booking_id, "no payment session; ignoring");
                        return vec![Effect::None];
                    },
                };

                let confirm = env.gateway.confirm_payment(secret);
                vec![Effect::Future(Box::pin(async move {
                    Some(match confirm.await {
                        Ok(intent) if intent.is_succeeded() => {
                            BookingFlowAction::GatewayConfirmed { booking_id }
                        },
                        Ok(intent) => BookingFlowAction::GatewayDenied {
                            booking_id,
                            message: format!(
                                "payment not completed (gateway status: {})",
                                intent.status
                            ),
                        },
                        Err(err) => BookingFlowAction::GatewayDenied {
                            booking_id,
                            message: err.to_string(),
                        },
                    })
                }))]
            },

            BookingFlowAction::GatewayConfirmed { booking_id } => {
                let Some(session) = state.sessions.get_mut(&booking_id) else {
                    tracing::warn!(%booking_id, "confirmation for unknown session");
                    return vec![Effect::None];
                };
                if !matches!(session.phase, PaymentPhase::Submitting(_)) {
                    tracing::warn!(%booking_id, "confirmation in unexpected phase; ignoring");
                    return vec![Effect::None];
                }

                session.phase = PaymentPhase::Succeeded;
                session.settle_until = Some(settle_deadline(env));
                state.notice = None;
                tracing::info!(%booking_id, "online payment completed");

                vec![settle_timer(booking_id, env.settle_window)]
            },

            BookingFlowAction::GatewayDenied {
                booking_id,
                message,
            } => {
                let Some(session) = state.sessions.get_mut(&booking_id) else {
                    tracing::warn!(%booking_id, "denial for unknown session");
                    return vec![Effect::None];
                };
                if !matches!(session.phase, PaymentPhase::Submitting(_)) {
                    tracing::warn!(%booking_id, "denial in unexpected phase; ignoring");
                    return vec![Effect::None];
                }

                session.phase = PaymentPhase::Failed;
                session.settle_until = Some(settle_deadline(env));
                state.notice = Some(message.clone());
                tracing::warn!(%booking_id, %message, "gateway denied payment; reverting to pay-later");

                // Compensation: the booking must never stay parked on an
                // unpaid online option.
                let revert = env.api.revert_to_pay_later(booking_id);
                vec![
                    Effect::Future(Box::pin(async move {
                        Some(match revert.await {
                            Ok(()) => BookingFlowAction::RevertSucceeded { booking_id },
                            Err(err) => BookingFlowAction::RevertFailed {
                                booking_id,
                                message: err.to_string(),
                            },
                        })
                    })),
                    settle_timer(booking_id, env.settle_window),
                ]
            },

            BookingFlowAction::RevertSucceeded { booking_id } => {
                tracing::info!(%booking_id, "booking reverted to pay-later");
                vec![Effect::None]
            },

            BookingFlowAction::RevertFailed {
                booking_id,
                message,
            } => {
                // Logged only: must not mask the original payment error.
                tracing::error!(%booking_id, %message, "revert-to-pay-later failed");
                vec![Effect::None]
            },

            BookingFlowAction::SettleElapsed { booking_id } => {
                let now = env.clock.now();
                let expired = state.sessions.get(&booking_id).is_some_and(|session| {
                    session.phase.is_terminal()
                        && session.settle_until.is_some_and(|until| now >= until)
                });

                if expired {
                    state.sessions.remove(&booking_id);
                    env.limiter.release(&pay_key(booking_id));
                    tracing::debug!(%booking_id, "payment session settled and destroyed");
                }
                vec![Effect::None]
            },
        }
    }
}

fn settle_deadline(env: &BookingFlowEnvironment) -> DateTime<Utc> {
    env.clock.now()
        + chrono::TimeDelta::from_std(env.settle_window).unwrap_or(chrono::TimeDelta::zero())
}

fn settle_timer(booking_id: BookingId, window: Duration) -> Effect<BookingFlowAction> {
    Effect::Delay {
        duration: window,
        action: Box::new(BookingFlowAction::SettleElapsed { booking_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBookingApi;
    use crate::error::ApiFailure;
    use crate::gateway::MockPaymentGateway;
    use crate::types::{BookingDraft, HotelId, Money, PaymentOption};
    use chrono::TimeDelta;
    use concierge_testing::{assertions, test_clock, ReducerTest, SteppingClock};

    fn env_with_clock(clock: Arc<dyn Clock>) -> BookingFlowEnvironment {
        BookingFlowEnvironment {
            api: Arc::new(MockBookingApi::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
            clock,
            limiter: Arc::new(RateLimiter::new(Duration::from_millis(300))),
            settle_window: Duration::from_millis(1_200),
        }
    }

    fn test_env() -> BookingFlowEnvironment {
        env_with_clock(Arc::new(test_clock()))
    }

    fn draft() -> BookingDraft {
        BookingDraft {
            hotel_id: HotelId::new(),
            check_in_date: "2025-02-01".parse().unwrap_or_default(),
            check_out_date: "2025-02-03".parse().unwrap_or_default(),
            room_type: "Double".to_string(),
            room_quantity: 1,
            nightly_rate: Money::from_cents(10_000),
            payment_option: PaymentOption::PayOnline,
            discount_percent: 10,
        }
    }

    fn session(phase: PaymentPhase) -> PaymentSession {
        PaymentSession {
            phase,
            settle_until: None,
        }
    }

    fn secret() -> ClientSecret {
        ClientSecret::new("cs_test".to_string())
    }

    #[test]
    fn invalid_draft_is_rejected_before_any_call() {
        let mut invalid = draft();
        invalid.check_out_date = invalid.check_in_date;

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState::default())
            .when_action(BookingFlowAction::CreateBooking { draft: invalid })
            .then_state(|state| {
                assert!(!state.create_in_flight);
                assert!(state.notice.is_some());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn second_create_while_in_flight_is_ignored() {
        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState::default())
            .when_action(BookingFlowAction::CreateBooking { draft: draft() })
            .when_action(BookingFlowAction::CreateBooking { draft: draft() })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn burst_retry_after_fast_failure_coalesces() {
        let booking_id = BookingId::new();

        // Initiation fails instantly; the retry lands inside the window
        // and must not produce a second network call.
        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState::default())
            .when_action(BookingFlowAction::RequestOnlinePayment { booking_id })
            .when_action(BookingFlowAction::PaymentInitiationFailed {
                booking_id,
                failure: ApiFailure {
                    message: "server error".to_string(),
                    auth: false,
                },
            })
            .when_action(BookingFlowAction::RequestOnlinePayment { booking_id })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn pay_intent_is_admitted_again_after_the_window() {
        let booking_id = BookingId::new();
        let clock = Arc::new(SteppingClock::new(test_clock().now()));
        let env = env_with_clock(clock.clone());
        let reducer = BookingFlowReducer;
        let mut state = BookingFlowState::default();

        let first = reducer.reduce(
            &mut state,
            BookingFlowAction::RequestOnlinePayment { booking_id },
            &env,
        );
        assert_eq!(first.iter().filter(|e| !e.is_none()).count(), 1);

        reducer.reduce(
            &mut state,
            BookingFlowAction::PaymentInitiationFailed {
                booking_id,
                failure: ApiFailure {
                    message: "server error".to_string(),
                    auth: false,
                },
            },
            &env,
        );

        clock.advance(TimeDelta::milliseconds(300));
        let retry = reducer.reduce(
            &mut state,
            BookingFlowAction::RequestOnlinePayment { booking_id },
            &env,
        );
        assert_eq!(retry.iter().filter(|e| !e.is_none()).count(), 1);
    }

    #[test]
    fn confirm_without_a_session_is_ignored() {
        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState::default())
            .when_action(BookingFlowAction::ConfirmPayment {
                booking_id: BookingId::new(),
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn duplicate_confirm_is_swallowed_while_submitting() {
        let booking_id = BookingId::new();
        let mut sessions = HashMap::new();
        sessions.insert(
            booking_id,
            session(PaymentPhase::AwaitingConfirmation(secret())),
        );

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                sessions,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::ConfirmPayment { booking_id })
            .when_action(BookingFlowAction::ConfirmPayment { booking_id })
            .then_state(move |state| {
                assert!(matches!(
                    state.phase(booking_id),
                    PaymentPhase::Submitting(_)
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn denial_fails_the_session_and_dispatches_the_revert() {
        let booking_id = BookingId::new();
        let mut sessions = HashMap::new();
        sessions.insert(booking_id, session(PaymentPhase::Submitting(secret())));

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                sessions,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::GatewayDenied {
                booking_id,
                message: "card declined: insufficient funds".to_string(),
            })
            .then_state(move |state| {
                assert_eq!(state.phase(booking_id), PaymentPhase::Failed);
                assert_eq!(
                    state.notice.as_deref(),
                    Some("card declined: insufficient funds")
                );
            })
            // Revert call plus the settle timer
            .then_effects(|effects| assertions::assert_effect_count(effects, 2))
            .run();
    }

    #[test]
    fn revert_failure_keeps_the_original_notice() {
        let booking_id = BookingId::new();
        let mut sessions = HashMap::new();
        sessions.insert(booking_id, session(PaymentPhase::Submitting(secret())));

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                sessions,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::GatewayDenied {
                booking_id,
                message: "card declined: insufficient funds".to_string(),
            })
            .when_action(BookingFlowAction::RevertFailed {
                booking_id,
                message: "server unavailable".to_string(),
            })
            .then_state(|state| {
                assert_eq!(
                    state.notice.as_deref(),
                    Some("card declined: insufficient funds")
                );
            })
            .run();
    }

    #[test]
    fn settle_window_blocks_a_new_pay_intent() {
        let booking_id = BookingId::new();
        let clock = test_clock();
        let mut failed = session(PaymentPhase::Failed);
        failed.settle_until = Some(clock.now() + TimeDelta::milliseconds(1_200));
        let mut sessions = HashMap::new();
        sessions.insert(booking_id, failed);

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                sessions,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::RequestOnlinePayment { booking_id })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn settle_elapsed_destroys_the_session_after_the_window() {
        let booking_id = BookingId::new();
        let clock = Arc::new(SteppingClock::new(test_clock().now()));
        let env = env_with_clock(clock.clone());
        let reducer = BookingFlowReducer;

        let mut failed = session(PaymentPhase::Failed);
        failed.settle_until = Some(clock.now() + TimeDelta::milliseconds(1_200));
        let mut state = BookingFlowState::default();
        state.sessions.insert(booking_id, failed);

        // Early tick: the window is still open, the session survives
        reducer.reduce(
            &mut state,
            BookingFlowAction::SettleElapsed { booking_id },
            &env,
        );
        assert_eq!(state.phase(booking_id), PaymentPhase::Failed);

        clock.advance(TimeDelta::milliseconds(1_200));
        reducer.reduce(
            &mut state,
            BookingFlowAction::SettleElapsed { booking_id },
            &env,
        );
        assert_eq!(state.phase(booking_id), PaymentPhase::Idle);
    }

    #[test]
    fn created_with_secret_opens_a_session() {
        let booking_id = BookingId::new();

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                create_in_flight: true,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::BookingCreated {
                booking_id,
                client_secret: Some(secret()),
            })
            .then_state(move |state| {
                assert!(!state.create_in_flight);
                assert_eq!(state.last_created, Some(booking_id));
                assert!(matches!(
                    state.phase(booking_id),
                    PaymentPhase::AwaitingConfirmation(_)
                ));
            })
            .run();
    }

    #[test]
    fn created_without_secret_is_terminal() {
        let booking_id = BookingId::new();

        ReducerTest::new(BookingFlowReducer)
            .with_env(test_env())
            .given_state(BookingFlowState {
                create_in_flight: true,
                ..BookingFlowState::default()
            })
            .when_action(BookingFlowAction::BookingCreated {
                booking_id,
                client_secret: None,
            })
            .then_state(move |state| {
                assert_eq!(state.phase(booking_id), PaymentPhase::Idle);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
