//! Application state shared across HTTP handlers.

use crate::auth::SessionAuthority;
use std::sync::Arc;
use ticketline_core::{BookingService, EventService};

/// Shared state handed to every handler.
///
/// Services are pre-wired with their store, ledger, and clock; handlers only
/// translate HTTP to domain calls and back.
#[derive(Clone)]
pub struct AppState {
    /// Event lifecycle service
    pub events: Arc<EventService>,
    /// Booking lifecycle service
    pub bookings: Arc<BookingService>,
    /// Session resolution for the auth extractors
    pub auth: Arc<dyn SessionAuthority>,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub fn new(
        events: Arc<EventService>,
        bookings: Arc<BookingService>,
        auth: Arc<dyn SessionAuthority>,
    ) -> Self {
        Self {
            events,
            bookings,
            auth,
        }
    }
}
