//! Typed REST client for the booking API.
//!
//! All server communication goes through the [`BookingApi`] trait so the
//! reducers can be exercised against [`MockBookingApi`] in tests. The
//! production implementation, [`HttpBookingApi`], attaches the session's
//! bearer credential to every request, applies per-endpoint timeouts, and
//! maps transport, auth, and envelope failures onto [`ClientError`].

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::session::Session;
use crate::types::{
    Booking, BookingDraft, BookingId, BookingStatus, ClientSecret, Money, Notification,
    NotificationId, PaymentOption, PaymentStatus,
};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by every API method
pub type ApiFuture<T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'static>>;

// ============================================================================
// Request / result types
// ============================================================================

/// Wire body for booking creation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Hotel to book
    pub hotel_id: crate::types::HotelId,
    /// Check-in date
    pub check_in_date: chrono::NaiveDate,
    /// Check-out date
    pub check_out_date: chrono::NaiveDate,
    /// Number of rooms
    pub room_quantity: u32,
    /// Room type name
    pub room_type: String,
    /// Chosen payment option
    pub payment_option: PaymentOption,
    /// Client-computed total, discount applied
    pub total_amount: Money,
    /// Discount percentage applied
    pub discount_applied: u8,
}

impl CreateBookingRequest {
    /// Build the wire body from a validated draft
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the draft fails local
    /// validation; no network call is made in that case.
    pub fn from_draft(draft: &BookingDraft) -> Result<Self, ClientError> {
        draft.validate().map_err(ClientError::Validation)?;
        let total_amount = draft
            .total_amount()
            .ok_or_else(|| ClientError::Validation("total amount is out of range".to_string()))?;

        Ok(Self {
            hotel_id: draft.hotel_id,
            check_in_date: draft.check_in_date,
            check_out_date: draft.check_out_date,
            room_quantity: draft.room_quantity,
            room_type: draft.room_type.clone(),
            payment_option: draft.payment_option,
            total_amount,
            discount_applied: draft.effective_discount(),
        })
    }
}

/// Result of booking creation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedBooking {
    /// Server-assigned booking id
    pub booking_id: BookingId,
    /// Gateway handle, present only for pay-online bookings
    pub client_secret: Option<ClientSecret>,
}

/// Result of pay-online initiation for an existing booking
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentInitiation {
    /// The booking being paid
    pub booking_id: BookingId,
    /// Gateway handle authorizing one confirmation attempt
    pub client_secret: ClientSecret,
}

// ============================================================================
// The API trait
// ============================================================================

/// Typed client for the booking REST API
///
/// Methods return boxed futures so effect closures can own the in-flight
/// call without borrowing the environment.
pub trait BookingApi: Send + Sync {
    /// POST booking-create
    fn create_booking(&self, request: CreateBookingRequest) -> ApiFuture<CreatedBooking>;

    /// GET booking-list, optionally filtered by persisted status
    fn list_bookings(&self, filter: Option<BookingStatus>) -> ApiFuture<Vec<Booking>>;

    /// POST booking-pay-online/{id}
    fn pay_online(&self, booking_id: BookingId) -> ApiFuture<PaymentInitiation>;

    /// POST booking-revert-to-pay-later/{id} (payment-failure compensation)
    fn revert_to_pay_later(&self, booking_id: BookingId) -> ApiFuture<()>;

    /// DELETE booking/{id} with a cancellation reason
    fn cancel_booking(&self, booking_id: BookingId, reason: String) -> ApiFuture<Option<Booking>>;

    /// GET booking-payment-status/{id}
    fn payment_status(&self, booking_id: BookingId) -> ApiFuture<PaymentStatus>;

    /// GET notifications
    fn fetch_notifications(&self) -> ApiFuture<Vec<Notification>>;

    /// POST notifications/{id}/read
    fn mark_notification_read(&self, id: NotificationId) -> ApiFuture<()>;

    /// POST notifications/mark-all-read
    fn mark_all_notifications_read(&self) -> ApiFuture<()>;
}

// ============================================================================
// Response envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingEnvelope {
    success: bool,
    booking_id: Option<BookingId>,
    client_secret: Option<ClientSecret>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingsEnvelope {
    success: bool,
    #[serde(default)]
    bookings: Vec<Booking>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayOnlineEnvelope {
    success: bool,
    booking_id: Option<BookingId>,
    client_secret: Option<ClientSecret>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AckEnvelope {
    success: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelEnvelope {
    success: bool,
    booking: Option<Booking>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentStatusEnvelope {
    success: bool,
    payment_status: Option<PaymentStatus>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationsEnvelope {
    success: bool,
    #[serde(default)]
    notifications: Vec<Notification>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelBody {
    cancellation_reason: String,
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Production [`BookingApi`] backed by reqwest
#[derive(Clone)]
pub struct HttpBookingApi {
    client: reqwest::Client,
    config: ApiConfig,
    session: Session,
}

impl HttpBookingApi {
    /// Create a client for one signed-in session
    #[must_use]
    pub fn new(config: ApiConfig, session: Session) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn get(&self, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(self.session.bearer_token())
            .timeout(timeout)
    }

    fn post(&self, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(self.session.bearer_token())
            .timeout(timeout)
    }

    fn delete(&self, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .bearer_auth(self.session.bearer_token())
            .timeout(timeout)
    }
}

/// Decode a response, mapping HTTP status onto the error taxonomy first
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Auth),
        status if status.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Server {
                message: format!("malformed response: {e}"),
            }),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::Server {
                message: format!("unexpected status {status}: {body}"),
            })
        },
    }
}

fn envelope_error(message: Option<String>) -> ClientError {
    ClientError::Server {
        message: message.unwrap_or_else(|| "request rejected".to_string()),
    }
}

impl BookingApi for HttpBookingApi {
    fn create_booking(&self, request: CreateBookingRequest) -> ApiFuture<CreatedBooking> {
        let builder = self
            .post("bookings", self.config.create_timeout())
            .json(&request);

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: CreateBookingEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            let booking_id = envelope
                .booking_id
                .ok_or_else(|| envelope_error(Some("missing booking id".to_string())))?;

            Ok(CreatedBooking {
                booking_id,
                client_secret: envelope.client_secret,
            })
        })
    }

    fn list_bookings(&self, filter: Option<BookingStatus>) -> ApiFuture<Vec<Booking>> {
        let mut builder = self.get("bookings", self.config.request_timeout());
        if let Some(status) = filter {
            let value = match status {
                BookingStatus::Active => "active",
                BookingStatus::Cancelled => "cancelled",
            };
            builder = builder.query(&[("status", value)]);
        }

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: BookingsEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(envelope.bookings)
        })
    }

    fn pay_online(&self, booking_id: BookingId) -> ApiFuture<PaymentInitiation> {
        let builder = self.post(
            &format!("bookings/{booking_id}/pay-online"),
            self.config.payment_timeout(),
        );

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: PayOnlineEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            let client_secret = envelope
                .client_secret
                .ok_or_else(|| envelope_error(Some("missing client secret".to_string())))?;

            Ok(PaymentInitiation {
                booking_id: envelope.booking_id.unwrap_or(booking_id),
                client_secret,
            })
        })
    }

    fn revert_to_pay_later(&self, booking_id: BookingId) -> ApiFuture<()> {
        let builder = self.post(
            &format!("bookings/{booking_id}/revert-to-pay-later"),
            self.config.request_timeout(),
        );

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: AckEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(())
        })
    }

    fn cancel_booking(&self, booking_id: BookingId, reason: String) -> ApiFuture<Option<Booking>> {
        let builder = self
            .delete(
                &format!("bookings/{booking_id}"),
                self.config.request_timeout(),
            )
            .json(&CancelBody {
                cancellation_reason: reason,
            });

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: CancelEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(envelope.booking)
        })
    }

    fn payment_status(&self, booking_id: BookingId) -> ApiFuture<PaymentStatus> {
        let builder = self.get(
            &format!("bookings/{booking_id}/payment-status"),
            self.config.request_timeout(),
        );

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: PaymentStatusEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            envelope
                .payment_status
                .ok_or_else(|| envelope_error(Some("missing payment status".to_string())))
        })
    }

    fn fetch_notifications(&self) -> ApiFuture<Vec<Notification>> {
        let builder = self.get("notifications", self.config.request_timeout());

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: NotificationsEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(envelope.notifications)
        })
    }

    fn mark_notification_read(&self, id: NotificationId) -> ApiFuture<()> {
        let builder = self.post(
            &format!("notifications/{id}/read"),
            self.config.request_timeout(),
        );

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: AckEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(())
        })
    }

    fn mark_all_notifications_read(&self) -> ApiFuture<()> {
        let builder = self.post("notifications/mark-all-read", self.config.request_timeout());

        Box::pin(async move {
            let response = builder.send().await.map_err(ClientError::from)?;
            let envelope: AckEnvelope = decode(response).await?;
            if !envelope.success {
                return Err(envelope_error(envelope.message));
            }
            Ok(())
        })
    }
}

// ============================================================================
// Mock implementation
// ============================================================================

/// One recorded API call, for asserting on network traffic in tests
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ApiCall {
    CreateBooking,
    ListBookings,
    PayOnline(BookingId),
    RevertToPayLater(BookingId),
    CancelBooking(BookingId),
    PaymentStatus(BookingId),
    FetchNotifications,
    MarkNotificationRead(NotificationId),
    MarkAllNotificationsRead,
}

type Script<T> = std::sync::Mutex<std::collections::VecDeque<Result<T, ClientError>>>;

/// Scriptable in-memory [`BookingApi`] for tests
///
/// Each method pops its next scripted outcome; with an empty script the
/// call succeeds against the mock's in-memory server state. Every call is
/// recorded for traffic assertions (e.g. burst coalescing produces exactly
/// one pay-online call).
#[derive(Default)]
pub struct MockBookingApi {
    calls: std::sync::Mutex<Vec<ApiCall>>,
    /// The "server's" booking list, returned wholesale by `list_bookings`
    bookings: std::sync::Mutex<Vec<Booking>>,
    notifications: std::sync::Mutex<Vec<Notification>>,
    create_results: Script<CreatedBooking>,
    pay_online_results: Script<PaymentInitiation>,
    revert_results: Script<()>,
    cancel_results: Script<Option<Booking>>,
    payment_status_results: Script<PaymentStatus>,
    mark_read_results: Script<()>,
}

impl MockBookingApi {
    /// Create an empty mock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }

    /// Replace the mock server's booking list
    pub fn set_bookings(&self, bookings: Vec<Booking>) {
        *lock(&self.bookings) = bookings;
    }

    /// Replace the mock server's notification list
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        *lock(&self.notifications) = notifications;
    }

    /// Queue the next `create_booking` outcome
    pub fn push_create_result(&self, result: Result<CreatedBooking, ClientError>) {
        lock(&self.create_results).push_back(result);
    }

    /// Queue the next `pay_online` outcome
    pub fn push_pay_online_result(&self, result: Result<PaymentInitiation, ClientError>) {
        lock(&self.pay_online_results).push_back(result);
    }

    /// Queue the next `revert_to_pay_later` outcome
    pub fn push_revert_result(&self, result: Result<(), ClientError>) {
        lock(&self.revert_results).push_back(result);
    }

    /// Queue the next `cancel_booking` outcome
    pub fn push_cancel_result(&self, result: Result<Option<Booking>, ClientError>) {
        lock(&self.cancel_results).push_back(result);
    }

    /// Queue the next `payment_status` outcome
    pub fn push_payment_status_result(&self, result: Result<PaymentStatus, ClientError>) {
        lock(&self.payment_status_results).push_back(result);
    }

    /// Queue the next mark-read / mark-all-read outcome
    pub fn push_mark_read_result(&self, result: Result<(), ClientError>) {
        lock(&self.mark_read_results).push_back(result);
    }

    /// All recorded calls, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls matching the predicate
    pub fn call_count<F: Fn(&ApiCall) -> bool>(&self, predicate: F) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: ApiCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn ready<T: Send + 'static>(result: Result<T, ClientError>) -> ApiFuture<T> {
    Box::pin(async move { result })
}

impl BookingApi for MockBookingApi {
    fn create_booking(&self, _request: CreateBookingRequest) -> ApiFuture<CreatedBooking> {
        self.record(ApiCall::CreateBooking);
        let result = lock(&self.create_results).pop_front().unwrap_or_else(|| {
            Ok(CreatedBooking {
                booking_id: BookingId::new(),
                client_secret: None,
            })
        });
        ready(result)
    }

    fn list_bookings(&self, _filter: Option<BookingStatus>) -> ApiFuture<Vec<Booking>> {
        self.record(ApiCall::ListBookings);
        ready(Ok(lock(&self.bookings).clone()))
    }

    fn pay_online(&self, booking_id: BookingId) -> ApiFuture<PaymentInitiation> {
        self.record(ApiCall::PayOnline(booking_id));
        let result = lock(&self.pay_online_results).pop_front().unwrap_or_else(|| {
            Ok(PaymentInitiation {
                booking_id,
                client_secret: ClientSecret::new(format!("cs_{booking_id}")),
            })
        });
        ready(result)
    }

    fn revert_to_pay_later(&self, booking_id: BookingId) -> ApiFuture<()> {
        self.record(ApiCall::RevertToPayLater(booking_id));
        let result = lock(&self.revert_results).pop_front().unwrap_or(Ok(()));
        ready(result)
    }

    fn cancel_booking(&self, booking_id: BookingId, _reason: String) -> ApiFuture<Option<Booking>> {
        self.record(ApiCall::CancelBooking(booking_id));
        let result = lock(&self.cancel_results).pop_front().unwrap_or(Ok(None));
        ready(result)
    }

    fn payment_status(&self, booking_id: BookingId) -> ApiFuture<PaymentStatus> {
        self.record(ApiCall::PaymentStatus(booking_id));
        let result = lock(&self.payment_status_results)
            .pop_front()
            .unwrap_or(Ok(PaymentStatus::Pending));
        ready(result)
    }

    fn fetch_notifications(&self) -> ApiFuture<Vec<Notification>> {
        self.record(ApiCall::FetchNotifications);
        ready(Ok(lock(&self.notifications).clone()))
    }

    fn mark_notification_read(&self, id: NotificationId) -> ApiFuture<()> {
        self.record(ApiCall::MarkNotificationRead(id));
        let result = lock(&self.mark_read_results).pop_front().unwrap_or(Ok(()));
        ready(result)
    }

    fn mark_all_notifications_read(&self) -> ApiFuture<()> {
        self.record(ApiCall::MarkAllNotificationsRead);
        let result = lock(&self.mark_read_results).pop_front().unwrap_or(Ok(()));
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HotelId, PaymentOption};

    #[test]
    fn invalid_draft_never_builds_a_request() {
        let draft = BookingDraft {
            hotel_id: HotelId::new(),
            check_in_date: "2024-06-03".parse().unwrap_or_default(),
            check_out_date: "2024-06-01".parse().unwrap_or_default(),
            room_type: "Double".to_string(),
            room_quantity: 1,
            nightly_rate: Money::from_cents(10_000),
            payment_option: PaymentOption::PayLater,
            discount_percent: 0,
        };

        let result = CreateBookingRequest::from_draft(&draft);
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn mock_records_traffic() {
        let api = MockBookingApi::new();
        let booking_id = BookingId::new();

        let _ = api.pay_online(booking_id).await;
        let _ = api.pay_online(booking_id).await;

        assert_eq!(
            api.call_count(|c| matches!(c, ApiCall::PayOnline(_))),
            2
        );
    }
}
