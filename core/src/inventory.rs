//! Inventory ledger: the accounting responsibility for ticket counts.
//!
//! Every mutation of `remaining_tickets` goes through this ledger and bottoms
//! out in one of the store's atomic conditional updates, so concurrent
//! reservations against the same event serialize in the store and the sum of
//! successful reservations can never exceed `total_tickets`.

use crate::error::{CoreError, Result};
use crate::store::{CancelOutcome, StoreError, TicketStore};
use crate::types::{Booking, EventId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy for transient store conflicts.
///
/// User-facing rejections (`InsufficientInventory`, `EventNotBookable`, ...)
/// are never retried; only `StoreError::Conflict` is.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.min(16) as u32);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Guards the per-event ticket counts.
///
/// Guarantees `0 <= remaining_tickets <= total_tickets` at all times and
/// that `total_tickets - remaining_tickets` equals the tickets held by
/// confirmed bookings.
pub struct InventoryLedger {
    store: Arc<dyn TicketStore>,
    retry: RetryPolicy,
}

impl InventoryLedger {
    /// Creates a ledger over the given store with the default retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the conflict retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn with_conflict_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(StoreError::Conflict) if attempt < self.retry.max_retries => {
                    tracing::debug!(attempt, "store conflict, retrying");
                    sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                other => return other.map_err(CoreError::from),
            }
        }
    }

    /// Reserve `quantity` tickets against an approved event.
    ///
    /// The test-and-decrement is a single atomic store operation; when it
    /// does not match, one follow-up read classifies the rejection.
    ///
    /// # Errors
    ///
    /// `EventNotFound`, `EventNotBookable`, `InsufficientInventory`, or a
    /// store failure after retries are exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, event_id: EventId, quantity: u32) -> Result<()> {
        let reserved = self
            .with_conflict_retry(move || self.store.try_reserve(event_id, quantity))
            .await?;
        if reserved {
            tracing::debug!(%event_id, quantity, "tickets reserved");
            return Ok(());
        }

        // The conditional update did not match; classify why.
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        if !event.status.is_bookable() {
            return Err(CoreError::EventNotBookable(event.status));
        }
        Err(CoreError::InsufficientInventory {
            requested: quantity,
            remaining: event.remaining_tickets,
        })
    }

    /// Return `quantity` tickets to the event's pool, clamped to
    /// `total_tickets` (defends against duplicate release calls).
    ///
    /// # Errors
    ///
    /// `EventNotFound`, or a store failure after retries are exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, event_id: EventId, quantity: u32) -> Result<()> {
        let released = self
            .with_conflict_retry(move || self.store.release(event_id, quantity))
            .await?;
        if released {
            tracing::debug!(%event_id, quantity, "tickets released");
            Ok(())
        } else {
            Err(CoreError::EventNotFound(event_id))
        }
    }

    /// Change an event's total capacity, adjusting `remaining_tickets` by the
    /// delta. Rejects totals below the tickets currently held.
    ///
    /// # Errors
    ///
    /// `InvalidTotal`, `EventNotFound`, or a store failure after retries are
    /// exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn resize(&self, event_id: EventId, new_total: u32) -> Result<()> {
        if new_total == 0 {
            return Err(CoreError::InvalidTotal {
                requested: new_total,
                held: 0,
            });
        }
        let resized = self
            .with_conflict_retry(move || self.store.try_resize(event_id, new_total))
            .await?;
        if resized {
            tracing::info!(%event_id, new_total, "capacity resized");
            return Ok(());
        }

        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        Err(CoreError::InvalidTotal {
            requested: new_total,
            held: event.tickets_held(),
        })
    }

    /// Flip a confirmed booking to cancelled and return its tickets, as one
    /// atomic store transaction. The status flip is the idempotency guard:
    /// a cancelled booking releases its quantity exactly once.
    ///
    /// # Errors
    ///
    /// `AlreadyCancelled`, `BookingNotFound`, or a store failure after
    /// retries are exhausted.
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub async fn settle_cancellation(&self, booking: &Booking) -> Result<()> {
        let outcome = self
            .with_conflict_retry(move || {
                self.store
                    .cancel_booking(booking.id, booking.event_id, booking.quantity)
            })
            .await?;
        match outcome {
            CancelOutcome::Cancelled => {
                tracing::info!(booking_id = %booking.id, event_id = %booking.event_id, "booking cancelled");
                Ok(())
            }
            CancelOutcome::AlreadyCancelled => Err(CoreError::AlreadyCancelled(booking.id)),
            CancelOutcome::NotFound => Err(CoreError::BookingNotFound(booking.id)),
        }
    }
}
