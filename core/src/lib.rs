//! Domain core for the ticketline event-ticketing system.
//!
//! Three responsibilities, leaf-first:
//!
//! - **Inventory ledger** ([`inventory::InventoryLedger`]): owns every
//!   mutation of an event's `remaining_tickets`. Reservations are atomic
//!   conditional updates in the store, so concurrent bookings against the
//!   same event can never oversell.
//! - **Booking lifecycle** ([`booking::BookingService`]): creation, pricing
//!   (standard/VIP), and cancellation with a 24h cutoff before the event.
//! - **Event lifecycle** ([`events::EventService`]): organizer submission,
//!   admin moderation (`pending -> approved | declined`), content edits,
//!   and the visibility rule.
//!
//! Persistence sits behind the [`store::TicketStore`] trait; the crate ships
//! an in-memory implementation ([`memory::MemoryStore`]) for tests and local
//! development, and `ticketline-postgres` provides the production store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod clock;
pub mod error;
pub mod events;
pub mod inventory;
pub mod memory;
pub mod store;
pub mod types;

pub use booking::{BookingRequest, BookingService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use events::EventService;
pub use inventory::{InventoryLedger, RetryPolicy};
pub use memory::MemoryStore;
pub use store::{BookingFilter, CancelOutcome, EventFilter, StoreError, TicketStore};
pub use types::{
    Actor, Booking, BookingId, BookingStatus, ContactInfo, Event, EventDraft, EventId,
    EventPatch, ModerationDecision, ModerationStatus, Money, Role, TicketType, UserId,
};
