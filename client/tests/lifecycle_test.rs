//! Store-level tests for the booking lifecycle.
//!
//! These run the real `Store` runtime against the mock API and mock
//! gateway: actions are dispatched, effects execute on the runtime, and
//! the resulting feedback actions drive the state machine end to end.

#![allow(clippy::expect_used)] // Integration tests can use expect for setup
#![allow(clippy::unwrap_used)] // Integration tests can use unwrap for assertions

use concierge_client::api::{ApiCall, CreatedBooking, MockBookingApi};
use concierge_client::booking::orchestrator::{
    BookingFlowAction, BookingFlowEnvironment, BookingFlowReducer, BookingFlowState, PaymentPhase,
};
use concierge_client::booking::reconciler::{
    BookingListAction, BookingListEnvironment, BookingListReducer, BookingListState,
};
use concierge_client::error::ClientError;
use concierge_client::gateway::{GatewayError, MockPaymentGateway};
use concierge_client::booking::spawn_refresh_forwarder;
use concierge_client::notifications::store::{
    NotificationAction, NotificationFeedEnvironment, NotificationFeedReducer,
    NotificationFeedState,
};
use concierge_client::{spawn_auth_sentinel, Session};
use concierge_client::types::{
    Booking, BookingDraft, BookingId, BookingStatus, ClientSecret, HotelId, Money, Notification,
    NotificationId, NotificationKind, PaymentOption, PaymentStatus,
};
use concierge_runtime::{RateLimiter, Store};
use concierge_testing::test_clock;
use std::sync::Arc;
use std::time::Duration;

fn draft() -> BookingDraft {
    BookingDraft {
        hotel_id: HotelId::new(),
        check_in_date: "2025-02-01".parse().unwrap(),
        check_out_date: "2025-02-03".parse().unwrap(),
        room_type: "Double".to_string(),
        room_quantity: 1,
        nightly_rate: Money::from_cents(10_000),
        payment_option: PaymentOption::PayOnline,
        discount_percent: 10,
    }
}

fn active_booking() -> Booking {
    Booking {
        id: BookingId::new(),
        hotel_id: HotelId::new(),
        check_in_date: "2025-02-01".parse().unwrap(),
        check_out_date: "2025-02-03".parse().unwrap(),
        room_type: "Double".to_string(),
        room_quantity: 1,
        total_amount: Money::from_cents(20_000),
        discount_applied: 0,
        payment_option: PaymentOption::PayLater,
        payment_status: PaymentStatus::Pending,
        status: BookingStatus::Active,
        cancelled_at: None,
        cancelled_by: None,
    }
}

fn unread_notification() -> Notification {
    Notification {
        id: NotificationId::new(),
        kind: NotificationKind::Booking,
        title: "Booking confirmed".to_string(),
        message: "See you soon".to_string(),
        link: None,
        read: false,
        created_at: chrono::Utc::now(),
    }
}

fn flow_env(
    api: Arc<MockBookingApi>,
    gateway: Arc<MockPaymentGateway>,
) -> BookingFlowEnvironment {
    BookingFlowEnvironment {
        api,
        gateway,
        clock: Arc::new(test_clock()),
        limiter: Arc::new(RateLimiter::new(Duration::from_millis(300))),
        settle_window: Duration::from_millis(1_200),
    }
}

fn list_env(api: Arc<MockBookingApi>, poll_interval: Duration) -> BookingListEnvironment {
    BookingListEnvironment {
        api,
        clock: Arc::new(test_clock()),
        poll_interval,
    }
}

/// Poll the store until `check` holds or the timeout elapses.
async fn wait_until<S, A, E, R, F>(store: &Store<S, A, E, R>, check: F)
where
    R: concierge_core::reducer::Reducer<State = S, Action = A, Environment = E>
        + Clone
        + Send
        + Sync
        + 'static,
    A: Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(&S) -> bool + Copy,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.state(check).await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "store never reached the expected state"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn denied_payment_reverts_and_surfaces_the_gateway_error() {
    let api = MockBookingApi::shared();
    let gateway = MockPaymentGateway::shared();
    let booking_id = BookingId::new();

    api.push_create_result(Ok(CreatedBooking {
        booking_id,
        client_secret: Some(ClientSecret::new("cs_declined".to_string())),
    }));
    gateway.push_outcome(Err(GatewayError::CardDeclined {
        reason: "insufficient funds".to_string(),
    }));

    let store = Store::new(
        BookingFlowState::default(),
        BookingFlowReducer,
        flow_env(api.clone(), gateway.clone()),
    );

    store
        .send_and_wait_for(
            BookingFlowAction::CreateBooking { draft: draft() },
            |a| matches!(a, BookingFlowAction::BookingCreated { .. }),
            Duration::from_secs(2),
        )
        .await
        .expect("booking creation should round-trip");

    store
        .send_and_wait_for(
            BookingFlowAction::ConfirmPayment { booking_id },
            |a| {
                matches!(
                    a,
                    BookingFlowAction::RevertSucceeded { .. }
                        | BookingFlowAction::RevertFailed { .. }
                )
            },
            Duration::from_secs(2),
        )
        .await
        .expect("denial should trigger the revert compensation");

    // The original gateway error is what the user sees
    let notice = store.state(|s| s.notice.clone()).await;
    assert!(notice.expect("notice should be set").contains("card declined"));

    // Exactly one compensating call
    assert_eq!(
        api.call_count(|c| matches!(c, ApiCall::RevertToPayLater(_))),
        1
    );
    assert_eq!(gateway.confirmed_secrets().len(), 1);
}

#[tokio::test]
async fn successful_payment_reaches_succeeded_and_never_reverts() {
    let api = MockBookingApi::shared();
    let gateway = MockPaymentGateway::shared(); // empty script: every confirm succeeds
    let booking_id = BookingId::new();

    api.push_create_result(Ok(CreatedBooking {
        booking_id,
        client_secret: Some(ClientSecret::new("cs_ok".to_string())),
    }));

    let store = Store::new(
        BookingFlowState::default(),
        BookingFlowReducer,
        flow_env(api.clone(), gateway),
    );

    store
        .send_and_wait_for(
            BookingFlowAction::CreateBooking { draft: draft() },
            |a| matches!(a, BookingFlowAction::BookingCreated { .. }),
            Duration::from_secs(2),
        )
        .await
        .expect("booking creation should round-trip");

    store
        .send_and_wait_for(
            BookingFlowAction::ConfirmPayment { booking_id },
            |a| matches!(a, BookingFlowAction::GatewayConfirmed { .. }),
            Duration::from_secs(2),
        )
        .await
        .expect("confirmation should succeed");

    wait_until(&store, move |s: &BookingFlowState| {
        s.phase(booking_id) == PaymentPhase::Succeeded
    })
    .await;

    assert_eq!(
        api.call_count(|c| matches!(c, ApiCall::RevertToPayLater(_))),
        0
    );
}

#[tokio::test]
async fn rejected_cancellation_restores_the_server_list() {
    let api = MockBookingApi::shared();
    let booking = active_booking();
    let booking_id = booking.id;

    // The server still holds the un-cancelled booking and rejects the cancel
    api.set_bookings(vec![booking.clone()]);
    api.push_cancel_result(Err(ClientError::Server {
        message: "cancellation window elapsed".to_string(),
    }));

    let store = Store::new(
        BookingListState {
            bookings: vec![booking],
            ..BookingListState::default()
        },
        BookingListReducer,
        list_env(api.clone(), Duration::from_secs(30)),
    );

    store
        .send_and_wait_for(
            BookingListAction::Cancel {
                booking_id,
                reason: "plans changed".to_string(),
            },
            |a| matches!(a, BookingListAction::Loaded { .. }),
            Duration::from_secs(2),
        )
        .await
        .expect("rejected cancel should trigger a refetch");

    // Discard-and-refetch: the optimistic flip is gone, the notice remains
    wait_until(&store, |s: &BookingListState| {
        !s.bookings.is_empty() && !s.bookings[0].is_cancelled() && s.notice.is_some()
    })
    .await;

    assert_eq!(api.call_count(|c| matches!(c, ApiCall::ListBookings)), 1);
}

#[tokio::test]
async fn pending_payment_poll_records_completion_and_disarms() {
    let api = MockBookingApi::shared();

    let mut pending = active_booking();
    pending.payment_option = PaymentOption::PayOnline;
    let booking_id = pending.id;

    // The server's authoritative copy is already completed; the poll's
    // status check reports it and the follow-up refetch adopts it.
    let mut completed = pending.clone();
    completed.payment_status = PaymentStatus::Completed;
    api.set_bookings(vec![completed]);
    api.push_payment_status_result(Ok(PaymentStatus::Completed));

    let store = Store::new(
        BookingListState {
            bookings: vec![pending],
            polling: true,
            poll_generation: 1,
            ..BookingListState::default()
        },
        BookingListReducer,
        list_env(api.clone(), Duration::from_millis(20)),
    );

    store
        .send_and_wait_for(
            BookingListAction::PollTick { generation: 1 },
            |a| {
                matches!(
                    a,
                    BookingListAction::PaymentStatusChecked {
                        status: PaymentStatus::Completed,
                        ..
                    }
                )
            },
            Duration::from_secs(2),
        )
        .await
        .expect("poll should observe the completed payment");

    wait_until(&store, move |s: &BookingListState| {
        !s.polling
            && s.bookings
                .iter()
                .any(|b| b.id == booking_id && b.payment_status == PaymentStatus::Completed)
    })
    .await;

    assert!(api.call_count(|c| matches!(c, ApiCall::PaymentStatus(_))) >= 1);
}

#[tokio::test]
async fn pay_online_initiation_triggers_a_list_refresh() {
    let api = MockBookingApi::shared();
    let gateway = MockPaymentGateway::shared();

    // The server already sees the booking as a pending online payment, so
    // the forwarded refresh must arm the poll loop.
    let mut booking = active_booking();
    booking.payment_option = PaymentOption::PayOnline;
    let booking_id = booking.id;
    api.set_bookings(vec![booking]);

    let flow = Store::new(
        BookingFlowState::default(),
        BookingFlowReducer,
        flow_env(api.clone(), gateway),
    );
    let list = Store::new(
        BookingListState::default(),
        BookingListReducer,
        list_env(api.clone(), Duration::from_secs(30)),
    );
    let _forwarder = spawn_refresh_forwarder(&flow, list.clone());

    flow.send_and_wait_for(
        BookingFlowAction::RequestOnlinePayment { booking_id },
        |a| matches!(a, BookingFlowAction::PaymentInitiated { .. }),
        Duration::from_secs(2),
    )
    .await
    .expect("initiation should round-trip");

    // Initiation alone (no confirmation yet) must refetch the list
    wait_until(&list, |s: &BookingListState| {
        s.polling && !s.bookings.is_empty()
    })
    .await;

    assert!(api.call_count(|c| matches!(c, ApiCall::ListBookings)) >= 1);
}

#[tokio::test]
async fn rejected_credential_clears_the_session() {
    let api = MockBookingApi::shared();
    let gateway = MockPaymentGateway::shared();
    let session = Session::new(uuid::Uuid::new_v4(), "stale-token".to_string());

    let booking = active_booking();
    let booking_id = booking.id;
    api.push_cancel_result(Err(ClientError::Auth));

    let flow = Store::new(
        BookingFlowState::default(),
        BookingFlowReducer,
        flow_env(api.clone(), gateway),
    );
    let list = Store::new(
        BookingListState {
            bookings: vec![booking],
            ..BookingListState::default()
        },
        BookingListReducer,
        list_env(api.clone(), Duration::from_secs(30)),
    );
    let feed = Store::new(
        NotificationFeedState::default(),
        NotificationFeedReducer,
        NotificationFeedEnvironment { api: api.clone() },
    );
    let _sentinel = spawn_auth_sentinel(&flow, &list, &feed, session.clone());
    assert!(session.is_alive());

    list.send_and_wait_for(
        BookingListAction::Cancel {
            booking_id,
            reason: "plans changed".to_string(),
        },
        |a| matches!(a, BookingListAction::CancelRejected { .. }),
        Duration::from_secs(2),
    )
    .await
    .expect("the stale credential should be rejected");

    // The sentinel observes the auth-flagged rejection and kills the session
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while session.is_alive() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session should be invalidated after an auth rejection"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(list.state(|s| s.auth_expired).await);
}

#[tokio::test]
async fn feed_fetch_then_pushed_events_stay_consistent() {
    let api = MockBookingApi::shared();
    let unread = unread_notification();
    let mut read = unread_notification();
    read.read = true;
    api.set_notifications(vec![unread, read]);

    let store = Store::new(
        NotificationFeedState::default(),
        NotificationFeedReducer,
        NotificationFeedEnvironment { api: api.clone() },
    );

    store
        .send_and_wait_for(
            NotificationAction::FetchAll,
            |a| matches!(a, NotificationAction::Fetched { .. }),
            Duration::from_secs(2),
        )
        .await
        .expect("fetch should round-trip");

    wait_until(&store, |s: &NotificationFeedState| {
        s.notifications.len() == 2 && s.unread_count == 1
    })
    .await;

    // Pushed events apply synchronously within send; a duplicate is dropped
    let pushed = unread_notification();
    let pushed_id = pushed.id;
    store
        .send(NotificationAction::Pushed {
            notification: Box::new(pushed.clone()),
        })
        .await
        .expect("send");
    store
        .send(NotificationAction::Pushed {
            notification: Box::new(pushed),
        })
        .await
        .expect("send");

    let (count, unread_count) = store
        .state(|s| (s.notifications.len(), s.unread_count))
        .await;
    assert_eq!(count, 3);
    assert_eq!(unread_count, 2);

    // The mark-read flip is optimistic and applies within send
    store
        .send(NotificationAction::MarkAsRead { id: pushed_id })
        .await
        .expect("send");

    wait_until(&store, |s: &NotificationFeedState| s.unread_count == 1).await;
    assert!(api.call_count(|c| matches!(c, ApiCall::MarkNotificationRead(_))) >= 1);
}
