//! Domain types for the Concierge booking engine.
//!
//! Value objects and entities shared by the booking orchestrator, the list
//! reconciler, and the notification feed. The server is the single source
//! of truth for every persisted field here; the client holds a cache that
//! may run optimistically ahead for a bounded window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a booking (opaque, server-assigned)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a hotel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotelId(Uuid);

impl HotelId {
    /// Creates a new random `HotelId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `HotelId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HotelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HotelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random `NotificationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `NotificationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in minor units (cents)
///
/// Non-negative by construction. Arithmetic is checked; discount math is
/// exact integer arithmetic so wire amounts round-trip without drift.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from minor units (cents)
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Amount in minor units (cents)
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Checked addition
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Checked multiplication by a count (rooms, nights)
    #[must_use]
    pub const fn checked_mul(self, factor: u64) -> Option<Self> {
        match self.0.checked_mul(factor) {
            Some(product) => Some(Self(product)),
            None => None,
        }
    }

    /// Apply a percentage discount (0..=100), rounding down
    #[must_use]
    pub const fn with_discount_percent(self, percent: u8) -> Self {
        let percent = if percent > 100 { 100 } else { percent as u64 };
        Self(self.0 * (100 - percent) / 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Booking
// ============================================================================

/// How the guest chose to pay at creation
///
/// Mutable only via the explicit pay-online / revert-to-pay-later
/// transitions driven by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    /// Settle at the hotel
    PayLater,
    /// Pay now through the card gateway (discount eligible)
    PayOnline,
}

/// Authoritative payment status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Payment not yet made
    Pending,
    /// Payment made - terminal, never regresses
    Completed,
    /// Payment attempt failed
    Failed,
}

/// Persisted booking status (the active lifecycle is derived from dates)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Booking is live; its category is derived from its dates
    Active,
    /// Explicitly cancelled
    Cancelled,
}

/// Who cancelled a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    /// The guest
    User,
    /// The hotel
    Hotel,
    /// An administrator
    Admin,
    /// Automated process
    System,
}

/// A hotel room reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Server-assigned identifier
    pub id: BookingId,
    /// Hotel being booked
    pub hotel_id: HotelId,
    /// Check-in date
    pub check_in_date: NaiveDate,
    /// Check-out date (strictly after check-in)
    pub check_out_date: NaiveDate,
    /// Room type name
    pub room_type: String,
    /// Number of rooms (>= 1)
    pub room_quantity: u32,
    /// Total amount, discount already applied
    pub total_amount: Money,
    /// Discount percentage applied (0 unless pay online)
    pub discount_applied: u8,
    /// Payment option chosen at creation
    pub payment_option: PaymentOption,
    /// Authoritative payment status
    pub payment_status: PaymentStatus,
    /// Persisted status
    pub status: BookingStatus,
    /// When the booking was cancelled (set only when status is Cancelled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled (set only when status is Cancelled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<CancelledBy>,
}

impl Booking {
    /// True if the booking was explicitly cancelled
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.status, BookingStatus::Cancelled)
    }

    /// True if this booking qualifies for the pending-payment poll:
    /// pay-online, payment still pending, not cancelled.
    #[must_use]
    pub const fn has_pending_online_payment(&self) -> bool {
        matches!(self.payment_option, PaymentOption::PayOnline)
            && matches!(self.payment_status, PaymentStatus::Pending)
            && !self.is_cancelled()
    }

    /// Mark the booking cancelled locally (optimistic update)
    ///
    /// No-op when already cancelled.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>, by: CancelledBy) {
        if self.is_cancelled() {
            return;
        }
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancelled_by = Some(by);
    }

    /// Record a completed payment
    ///
    /// `Completed` is terminal and never regresses; any other transition
    /// request is ignored.
    pub fn record_payment_status(&mut self, status: PaymentStatus) {
        if matches!(self.payment_status, PaymentStatus::Completed) {
            return;
        }
        self.payment_status = status;
    }
}

/// Derived, non-persisted classification of a booking relative to today
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingCategory {
    /// Check-in is in the future
    Upcoming,
    /// Today falls within the stay
    Active,
    /// Check-out has passed
    Completed,
    /// Explicitly cancelled, regardless of dates
    Cancelled,
}

// ============================================================================
// Booking draft (creation input)
// ============================================================================

/// Input for creating a booking, validated locally before any network call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    /// Hotel to book
    pub hotel_id: HotelId,
    /// Check-in date
    pub check_in_date: NaiveDate,
    /// Check-out date
    pub check_out_date: NaiveDate,
    /// Room type name
    pub room_type: String,
    /// Number of rooms
    pub room_quantity: u32,
    /// Nightly rate per room
    pub nightly_rate: Money,
    /// Chosen payment option
    pub payment_option: PaymentOption,
    /// Discount percentage (only meaningful with pay online)
    pub discount_percent: u8,
}

impl BookingDraft {
    /// Validate the draft locally, before any network call
    ///
    /// # Errors
    ///
    /// Returns the first human-readable problem found: inverted or empty
    /// date range, missing room type, zero rooms, or an amount overflow.
    pub fn validate(&self) -> Result<(), String> {
        if self.check_out_date <= self.check_in_date {
            return Err("check-out date must be after check-in date".to_string());
        }
        if self.room_type.trim().is_empty() {
            return Err("room type is required".to_string());
        }
        if self.room_quantity < 1 {
            return Err("at least one room is required".to_string());
        }
        if self.discount_percent > 100 {
            return Err("discount cannot exceed 100 percent".to_string());
        }
        if self.total_amount().is_none() {
            return Err("total amount is out of range".to_string());
        }
        Ok(())
    }

    /// Number of nights, zero if the range is inverted
    #[must_use]
    pub fn nights(&self) -> u64 {
        u64::try_from((self.check_out_date - self.check_in_date).num_days()).unwrap_or(0)
    }

    /// Total amount: rate x rooms x nights, discounted
    ///
    /// Returns `None` on arithmetic overflow.
    #[must_use]
    pub fn total_amount(&self) -> Option<Money> {
        self.nightly_rate
            .checked_mul(u64::from(self.room_quantity))?
            .checked_mul(self.nights())
            .map(|gross| gross.with_discount_percent(self.effective_discount()))
    }

    /// Discount actually applied: 0 unless paying online
    #[must_use]
    pub const fn effective_discount(&self) -> u8 {
        match self.payment_option {
            PaymentOption::PayOnline => self.discount_percent,
            PaymentOption::PayLater => 0,
        }
    }
}

// ============================================================================
// Payment gateway handle
// ============================================================================

/// Opaque, single-use handle issued by the payment gateway authorizing one
/// payment confirmation attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wrap a raw gateway secret
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Expose the raw secret for the gateway SDK
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification category as emitted by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Booking lifecycle events
    Booking,
    /// Review-related events
    Review,
    /// Payment results
    Payment,
    /// Platform announcements
    System,
    /// Any kind this client version does not know
    #[serde(other)]
    Other,
}

/// A single feed item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Server-assigned identifier
    pub id: NotificationId,
    /// Category
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Optional deep link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Read marker
    pub read: bool,
    /// Server-side creation time
    pub created_at: DateTime<Utc>,
}
