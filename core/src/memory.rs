//! In-memory `TicketStore` for unit tests and local development.
//!
//! A single mutex guards both document maps, which trivially gives every
//! conditional update the required atomicity. Not intended for production.

use crate::store::{
    BookingFilter, CancelOutcome, EventFilter, Result, StoreError, TicketStore,
};
use crate::types::{
    Booking, BookingId, BookingStatus, Event, EventId, EventPatch, ModerationStatus,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Documents {
    events: HashMap<EventId, Event>,
    bookings: HashMap<BookingId, Booking>,
}

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Documents>> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Backend("poisoned lock".to_string()))
    }
}

fn matches_event(event: &Event, filter: EventFilter) -> bool {
    let status_ok = filter.status.is_none_or(|s| event.status == s);
    let owner_ok = filter.organizer_id.is_none_or(|o| event.organizer_id == o);
    if filter.match_any && filter.status.is_some() && filter.organizer_id.is_some() {
        status_ok || owner_ok
    } else {
        status_ok && owner_ok
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.guard()?.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn fetch_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.guard()?.events.get(&id).cloned())
    }

    async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .guard()?
            .events
            .values()
            .filter(|e| matches_event(e, filter))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn update_event_content(&self, id: EventId, patch: &EventPatch) -> Result<bool> {
        let mut docs = self.guard()?;
        let Some(event) = docs.events.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(title) = &patch.title {
            event.title = title.clone();
        }
        if let Some(description) = &patch.description {
            event.description = description.clone();
        }
        if let Some(starts_at) = patch.starts_at {
            event.starts_at = starts_at;
        }
        if let Some(location) = &patch.location {
            event.location = location.clone();
        }
        if let Some(category) = &patch.category {
            event.category = category.clone();
        }
        if let Some(image_url) = &patch.image_url {
            event.image_url = Some(image_url.clone());
        }
        if let Some(ticket_price) = patch.ticket_price {
            event.ticket_price = ticket_price;
        }
        Ok(true)
    }

    async fn set_event_status(&self, id: EventId, status: ModerationStatus) -> Result<bool> {
        let mut docs = self.guard()?;
        match docs.events.get_mut(&id) {
            Some(event) => {
                event.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_reserve(&self, id: EventId, quantity: u32) -> Result<bool> {
        let mut docs = self.guard()?;
        let Some(event) = docs.events.get_mut(&id) else {
            return Ok(false);
        };
        if event.status.is_bookable() && event.remaining_tickets >= quantity {
            event.remaining_tickets -= quantity;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release(&self, id: EventId, quantity: u32) -> Result<bool> {
        let mut docs = self.guard()?;
        let Some(event) = docs.events.get_mut(&id) else {
            return Ok(false);
        };
        event.remaining_tickets = event
            .remaining_tickets
            .saturating_add(quantity)
            .min(event.total_tickets);
        Ok(true)
    }

    async fn try_resize(&self, id: EventId, new_total: u32) -> Result<bool> {
        let mut docs = self.guard()?;
        let Some(event) = docs.events.get_mut(&id) else {
            return Ok(false);
        };
        if new_total < event.tickets_held() {
            return Ok(false);
        }
        event.remaining_tickets = new_total - event.tickets_held();
        event.total_tickets = new_total;
        Ok(true)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        self.guard()?.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.guard()?.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .guard()?
            .bookings
            .values()
            .filter(|b| {
                filter.user_id.is_none_or(|u| b.user_id == u)
                    && filter.event_id.is_none_or(|e| b.event_id == e)
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn cancel_booking(
        &self,
        booking_id: BookingId,
        event_id: EventId,
        quantity: u32,
    ) -> Result<CancelOutcome> {
        // Both mutations happen under the one guard, so the flip and the
        // release are observed together or not at all.
        let mut docs = self.guard()?;
        match docs.bookings.get_mut(&booking_id) {
            None => return Ok(CancelOutcome::NotFound),
            Some(booking) if booking.status == BookingStatus::Cancelled => {
                return Ok(CancelOutcome::AlreadyCancelled);
            }
            Some(booking) => booking.status = BookingStatus::Cancelled,
        }
        if let Some(event) = docs.events.get_mut(&event_id) {
            event.remaining_tickets = event
                .remaining_tickets
                .saturating_add(quantity)
                .min(event.total_tickets);
        }
        Ok(CancelOutcome::Cancelled)
    }
}
