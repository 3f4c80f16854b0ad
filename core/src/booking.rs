//! Booking lifecycle: creation, pricing, and cancellation.
//!
//! Bookings are created directly in `Confirmed` (no payment step) and move
//! to `Cancelled` exactly once. Creation is all-or-nothing against the
//! inventory ledger: a failed reservation leaves no booking record, and a
//! failed insert after a successful reservation is compensated by a release.

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::inventory::InventoryLedger;
use crate::store::{BookingFilter, TicketStore};
use crate::types::{
    Actor, Booking, BookingId, BookingStatus, ContactInfo, EventId, Money, TicketType,
};
use chrono::Duration;
use std::sync::Arc;

/// Default cancellation cutoff: no cancellations inside 24 hours of the
/// event start.
pub const DEFAULT_CANCELLATION_CUTOFF_HOURS: i64 = 24;

/// Request payload for creating a booking.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// Event to book against
    pub event_id: EventId,
    /// Ticket tier
    pub ticket_type: TicketType,
    /// Number of tickets (must be >= 1)
    pub quantity: u32,
    /// Contact details
    pub contact: ContactInfo,
}

/// Computes the total price for a quantity of tickets.
///
/// `total = quantity * base_price * (vip ? 2 : 1)`, checked.
///
/// # Errors
///
/// Returns `AmountOverflow` if the multiplication overflows.
pub fn quote(base_price: Money, ticket_type: TicketType, quantity: u32) -> Result<(Money, Money)> {
    let unit_price = base_price
        .checked_multiply(ticket_type.price_multiplier())
        .ok_or(CoreError::AmountOverflow)?;
    let total = unit_price
        .checked_multiply(quantity)
        .ok_or(CoreError::AmountOverflow)?;
    Ok((unit_price, total))
}

/// Creates, cancels, and prices bookings against the inventory ledger.
pub struct BookingService {
    store: Arc<dyn TicketStore>,
    ledger: Arc<InventoryLedger>,
    clock: Arc<dyn Clock>,
    cancellation_cutoff: Duration,
}

impl BookingService {
    /// Creates a booking service with the default 24h cancellation cutoff.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        ledger: Arc<InventoryLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            cancellation_cutoff: Duration::hours(DEFAULT_CANCELLATION_CUTOFF_HOURS),
        }
    }

    /// Overrides the cancellation cutoff.
    #[must_use]
    pub fn with_cancellation_cutoff(mut self, cutoff: Duration) -> Self {
        self.cancellation_cutoff = cutoff;
        self
    }

    /// Book tickets for the acting user.
    ///
    /// Reserves through the inventory ledger first; the booking record is
    /// only persisted once the atomic reservation succeeded. No partial
    /// state survives a failure.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity`, `EventNotFound`, `EventNotBookable`,
    /// `InsufficientInventory`, `AmountOverflow`, or a store failure.
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id, quantity = request.quantity))]
    pub async fn create(&self, actor: &Actor, request: BookingRequest) -> Result<Booking> {
        if request.quantity == 0 {
            return Err(CoreError::InvalidQuantity(request.quantity));
        }

        // Price off the current event document. Moderation state is
        // pre-checked here for an early rejection; the authoritative gate is
        // the atomic reserve below.
        let event = self
            .store
            .fetch_event(request.event_id)
            .await?
            .ok_or(CoreError::EventNotFound(request.event_id))?;
        if !event.status.is_bookable() {
            return Err(CoreError::EventNotBookable(event.status));
        }
        let (unit_price, total_amount) =
            quote(event.ticket_price, request.ticket_type, request.quantity)?;

        self.ledger.reserve(request.event_id, request.quantity).await?;

        let booking = Booking {
            id: BookingId::new(),
            event_id: request.event_id,
            user_id: actor.id,
            ticket_type: request.ticket_type,
            quantity: request.quantity,
            unit_price,
            total_amount,
            status: BookingStatus::Confirmed,
            contact: request.contact,
            created_at: self.clock.now(),
        };

        if let Err(err) = self.store.insert_booking(&booking).await {
            // Undo the reservation so the failed create leaves no trace.
            tracing::error!(error = %err, booking_id = %booking.id, "booking insert failed, releasing reservation");
            if let Err(release_err) = self
                .ledger
                .release(request.event_id, request.quantity)
                .await
            {
                tracing::error!(error = %release_err, event_id = %request.event_id, "compensating release failed");
            }
            return Err(err.into());
        }

        tracing::info!(booking_id = %booking.id, total = %booking.total_amount, "booking confirmed");
        Ok(booking)
    }

    /// Cancel a booking on behalf of its owner or an admin.
    ///
    /// The status flip and the inventory release are one atomic store
    /// transaction, so a cancelled booking returns its tickets exactly once.
    ///
    /// # Errors
    ///
    /// `BookingNotFound`, `Forbidden`, `AlreadyCancelled`, `EventNotFound`,
    /// `CancellationWindowClosed`, or a store failure.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor: &Actor, booking_id: BookingId) -> Result<()> {
        let booking = self
            .store
            .fetch_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;

        if booking.user_id != actor.id && !actor.is_admin() {
            return Err(CoreError::Forbidden);
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled(booking_id));
        }

        let event = self
            .store
            .fetch_event(booking.event_id)
            .await?
            .ok_or(CoreError::EventNotFound(booking.event_id))?;
        if event.starts_at - self.clock.now() < self.cancellation_cutoff {
            return Err(CoreError::CancellationWindowClosed {
                cutoff_hours: self.cancellation_cutoff.num_hours(),
            });
        }

        self.ledger.settle_cancellation(&booking).await
    }

    /// Fetch a booking visible to its owner or an admin.
    ///
    /// # Errors
    ///
    /// `BookingNotFound` (also for bookings the caller may not see),
    /// or a store failure.
    pub async fn fetch(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let booking = self
            .store
            .fetch_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        if booking.user_id != actor.id && !actor.is_admin() {
            // Do not reveal whether the booking exists.
            return Err(CoreError::BookingNotFound(booking_id));
        }
        Ok(booking)
    }

    /// List the acting user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store failure if the read fails.
    pub async fn list_own(&self, actor: &Actor) -> Result<Vec<Booking>> {
        Ok(self
            .store
            .list_bookings(BookingFilter {
                user_id: Some(actor.id),
                event_id: None,
            })
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use crate::types::{Event, ModerationStatus, Role, UserId};
    use chrono::Utc;

    struct Fixture {
        service: BookingService,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(InventoryLedger::new(store.clone()));
        let clock = Arc::new(ManualClock::frozen_at(Utc::now()));
        let service = BookingService::new(store.clone(), ledger, clock.clone());
        Fixture {
            service,
            store,
            clock,
        }
    }

    async fn seed_event(
        fx: &Fixture,
        total: u32,
        price_cents: u64,
        starts_in_hours: i64,
        status: ModerationStatus,
    ) -> Event {
        let event = Event {
            id: EventId::new(),
            organizer_id: UserId::new(),
            title: "Open Mic".to_string(),
            description: "Weekly open mic".to_string(),
            starts_at: fx.clock.now() + Duration::hours(starts_in_hours),
            location: "Basement Bar".to_string(),
            category: "music".to_string(),
            image_url: None,
            ticket_price: Money::from_cents(price_cents),
            total_tickets: total,
            remaining_tickets: total,
            status,
            created_at: fx.clock.now(),
        };
        fx.store.insert_event(&event).await.unwrap();
        event
    }

    fn user() -> Actor {
        Actor::new(UserId::new(), Role::User)
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        }
    }

    fn request(event_id: EventId, ticket_type: TicketType, quantity: u32) -> BookingRequest {
        BookingRequest {
            event_id,
            ticket_type,
            quantity,
            contact: contact(),
        }
    }

    #[tokio::test]
    async fn standard_pricing_multiplies_quantity_by_base_price() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 2000, 72, ModerationStatus::Approved).await;

        let booking = fx
            .service
            .create(&user(), request(event.id, TicketType::Standard, 3))
            .await
            .unwrap();

        assert_eq!(booking.total_amount, Money::from_cents(6000));
        assert_eq!(booking.unit_price, Money::from_cents(2000));
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn vip_pricing_doubles_the_base_price() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 2000, 72, ModerationStatus::Approved).await;

        let booking = fx
            .service
            .create(&user(), request(event.id, TicketType::Vip, 3))
            .await
            .unwrap();

        assert_eq!(booking.total_amount, Money::from_cents(12000));
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_any_side_effect() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 2000, 72, ModerationStatus::Approved).await;

        let err = fx
            .service
            .create(&user(), request(event.id, TicketType::Standard, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity(0)));

        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 10);
    }

    #[tokio::test]
    async fn failed_reservation_creates_no_booking_record() {
        let fx = fixture();
        let event = seed_event(&fx, 2, 1000, 72, ModerationStatus::Approved).await;
        let actor = user();

        let err = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientInventory { .. }));

        assert!(fx.service.list_own(&actor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn booking_against_pending_event_is_rejected() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 72, ModerationStatus::Pending).await;

        let err = fx
            .service
            .create(&user(), request(event.id, TicketType::Standard, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EventNotBookable(_)));
    }

    #[tokio::test]
    async fn cancel_returns_tickets_and_is_idempotent() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 72, ModerationStatus::Approved).await;
        let actor = user();

        let booking = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 4))
            .await
            .unwrap();
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 6);

        fx.service.cancel(&actor, booking.id).await.unwrap();
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 10);

        // Second cancel: AlreadyCancelled, and the count is unchanged.
        let err = fx.service.cancel(&actor, booking.id).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCancelled(_)));
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 10);
    }

    #[tokio::test]
    async fn cutoff_blocks_cancellation_inside_24_hours() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 23, ModerationStatus::Approved).await;
        let actor = user();

        let booking = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 1))
            .await
            .unwrap();

        let err = fx.service.cancel(&actor, booking.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::CancellationWindowClosed { cutoff_hours: 24 }
        ));
    }

    #[tokio::test]
    async fn cutoff_allows_cancellation_outside_24_hours() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 25, ModerationStatus::Approved).await;
        let actor = user();

        let booking = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 1))
            .await
            .unwrap();
        fx.service.cancel(&actor, booking.id).await.unwrap();
    }

    #[tokio::test]
    async fn cutoff_boundary_moves_with_the_clock() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 48, ModerationStatus::Approved).await;
        let actor = user();

        let booking = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 1))
            .await
            .unwrap();

        // 25 hours later the event starts in 23 hours.
        fx.clock.advance(Duration::hours(25));
        let err = fx.service.cancel(&actor, booking.id).await.unwrap_err();
        assert!(matches!(err, CoreError::CancellationWindowClosed { .. }));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_cancel() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 72, ModerationStatus::Approved).await;
        let owner = user();

        let booking = fx
            .service
            .create(&owner, request(event.id, TicketType::Standard, 2))
            .await
            .unwrap();

        let stranger = user();
        let err = fx.service.cancel(&stranger, booking.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));

        let admin = Actor::new(UserId::new(), Role::Admin);
        fx.service.cancel(&admin, booking.id).await.unwrap();
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 10);
    }

    #[tokio::test]
    async fn fetch_does_not_leak_other_users_bookings() {
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 72, ModerationStatus::Approved).await;
        let owner = user();
        let booking = fx
            .service
            .create(&owner, request(event.id, TicketType::Standard, 1))
            .await
            .unwrap();

        let stranger = user();
        let err = fx.service.fetch(&stranger, booking.id).await.unwrap_err();
        assert!(matches!(err, CoreError::BookingNotFound(_)));

        let admin = Actor::new(UserId::new(), Role::Admin);
        assert_eq!(fx.service.fetch(&admin, booking.id).await.unwrap().id, booking.id);
    }

    #[tokio::test]
    async fn held_tickets_match_confirmed_booking_quantities() {
        let fx = fixture();
        let event = seed_event(&fx, 20, 1000, 72, ModerationStatus::Approved).await;
        let a = user();
        let b = user();

        fx.service
            .create(&a, request(event.id, TicketType::Standard, 5))
            .await
            .unwrap();
        let cancelled = fx
            .service
            .create(&b, request(event.id, TicketType::Vip, 4))
            .await
            .unwrap();
        fx.service
            .create(&b, request(event.id, TicketType::Standard, 2))
            .await
            .unwrap();
        fx.service.cancel(&b, cancelled.id).await.unwrap();

        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        let confirmed_quantity: u32 = fx
            .store
            .list_bookings(BookingFilter {
                user_id: None,
                event_id: Some(event.id),
            })
            .await
            .unwrap()
            .iter()
            .filter(|b| b.is_active())
            .map(|b| b.quantity)
            .sum();
        assert_eq!(stored.tickets_held(), confirmed_quantity);
    }

    #[tokio::test]
    async fn full_booking_scenario() {
        // total=10, price=10.00, book 4 standard, cancel 25h+ out.
        let fx = fixture();
        let event = seed_event(&fx, 10, 1000, 26, ModerationStatus::Approved).await;
        let actor = user();

        let booking = fx
            .service
            .create(&actor, request(event.id, TicketType::Standard, 4))
            .await
            .unwrap();
        assert_eq!(booking.total_amount, Money::from_cents(4000));
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 6);

        fx.service.cancel(&actor, booking.id).await.unwrap();
        let stored = fx.store.fetch_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_tickets, 10);
        let booking = fx.store.fetch_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }
}
