//! Persistence contract between the domain core and the document store.
//!
//! The store is the single seam for I/O. Inventory mutations are expressed as
//! atomic conditional updates (`update-if` semantics): the condition and the
//! mutation are one store operation with no observable window in between.

use crate::types::{
    Booking, BookingId, Event, EventId, EventPatch, ModerationStatus, UserId,
};
use async_trait::async_trait;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by a `TicketStore` implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Concurrent-update conflict on an atomic primitive.
    ///
    /// Retryable: the inventory ledger retries a bounded number of times
    /// before surfacing it.
    #[error("concurrent update conflict")]
    Conflict,

    /// Backend failure (connection lost, query failed, bad document).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Outcome of the atomic cancel-and-release operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Booking flipped to cancelled and its tickets were returned.
    Cancelled,
    /// Booking was already cancelled; nothing changed.
    AlreadyCancelled,
    /// No booking with that ID exists.
    NotFound,
}

/// Filter for event listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    /// Restrict to a single moderation state.
    pub status: Option<ModerationStatus>,
    /// Restrict to events owned by this organizer.
    pub organizer_id: Option<UserId>,
    /// When both `status` and `organizer_id` are set, match either instead
    /// of both (organizer view: own events plus everything approved).
    pub match_any: bool,
}

/// Filter for booking listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingFilter {
    /// Restrict to bookings made by this user.
    pub user_id: Option<UserId>,
    /// Restrict to bookings against this event.
    pub event_id: Option<EventId>,
}

/// Document store holding event and booking documents.
///
/// Implementations must make `try_reserve`, `release`, `try_resize`, and
/// `cancel_booking` atomic with respect to concurrent calls targeting the
/// same event: a conditional update either fully applies or leaves the
/// document untouched.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new event document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the write fails.
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Fetch one event document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the read fails.
    async fn fetch_event(&self, id: EventId) -> Result<Option<Event>>;

    /// List event documents matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the read fails.
    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>>;

    /// Apply content fields of a patch (everything except `total_tickets`).
    ///
    /// Returns `false` when the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the write fails.
    async fn update_event_content(&self, id: EventId, patch: &EventPatch) -> Result<bool>;

    /// Set the moderation state. Returns `false` when the event does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the write fails.
    async fn set_event_status(&self, id: EventId, status: ModerationStatus) -> Result<bool>;

    /// Atomically decrement `remaining_tickets` by `quantity` if and only if
    /// the event is approved and `remaining_tickets >= quantity`.
    ///
    /// Returns `true` when the condition matched and the decrement was
    /// applied. A `false` return does not distinguish why; the ledger
    /// classifies with a follow-up read.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a retryable concurrent-update
    /// conflict, `StoreError::Backend` otherwise.
    async fn try_reserve(&self, id: EventId, quantity: u32) -> Result<bool>;

    /// Atomically increment `remaining_tickets` by `quantity`, clamped to
    /// `total_tickets`. Returns `false` when the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a retryable conflict,
    /// `StoreError::Backend` otherwise.
    async fn release(&self, id: EventId, quantity: u32) -> Result<bool>;

    /// Atomically set `total_tickets = new_total` and adjust
    /// `remaining_tickets` by the delta, clamped to `[0, new_total]`,
    /// if and only if `new_total` covers the tickets currently held.
    ///
    /// Returns `true` when applied; `false` when the event is missing or
    /// the condition failed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a retryable conflict,
    /// `StoreError::Backend` otherwise.
    async fn try_resize(&self, id: EventId, new_total: u32) -> Result<bool>;

    /// Persist a new booking document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the write fails.
    async fn insert_booking(&self, booking: &Booking) -> Result<()>;

    /// Fetch one booking document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the read fails.
    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// List booking documents matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the read fails.
    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>>;

    /// Atomically flip a confirmed booking to cancelled and return its
    /// tickets to the event's pool (clamped release), as one transaction.
    ///
    /// The status flip and the release commit together or not at all; a
    /// cancelled booking has returned its quantity exactly once.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a retryable conflict,
    /// `StoreError::Backend` otherwise.
    async fn cancel_booking(
        &self,
        booking_id: BookingId,
        event_id: EventId,
        quantity: u32,
    ) -> Result<CancelOutcome>;
}
