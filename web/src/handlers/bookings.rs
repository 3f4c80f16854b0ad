//! Booking lifecycle endpoints: creation, cancellation, listing.

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketline_core::{
    Booking, BookingId, BookingRequest, BookingStatus, ContactInfo, EventId, TicketType,
};
use uuid::Uuid;

/// Contact details submitted with a booking.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    /// Contact name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional phone number
    pub phone: Option<String>,
}

/// Request body for `POST /api/bookings`.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Event to book against
    pub event_id: Uuid,
    /// `standard` or `vip`
    pub ticket_type: TicketType,
    /// Number of tickets
    pub quantity: u32,
    /// Contact details
    pub contact: ContactRequest,
}

/// Booking representation returned to clients.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking ID
    pub id: BookingId,
    /// Booked event
    pub event_id: EventId,
    /// Ticket tier
    pub ticket_type: TicketType,
    /// Number of tickets held
    pub quantity: u32,
    /// Price per ticket in cents, after the tier multiplier
    pub unit_price_cents: u64,
    /// Total amount in cents
    pub total_amount_cents: u64,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            event_id: booking.event_id,
            ticket_type: booking.ticket_type,
            quantity: booking.quantity,
            unit_price_cents: booking.unit_price.cents(),
            total_amount_cents: booking.total_amount.cents(),
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

/// `POST /api/bookings` - book tickets against an approved event.
pub async fn create_booking(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .bookings
        .create(
            &actor,
            BookingRequest {
                event_id: EventId::from_uuid(request.event_id),
                ticket_type: request.ticket_type,
                quantity: request.quantity,
                contact: ContactInfo {
                    name: request.contact.name,
                    email: request.contact.email,
                    phone: request.contact.phone,
                },
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// `PUT /api/bookings/:id/cancel` - cancel a booking, returning its tickets.
pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .bookings
        .cancel(&actor, BookingId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/bookings/:id` - fetch one of the caller's bookings.
pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .bookings
        .fetch(&actor, BookingId::from_uuid(id))
        .await?;
    Ok(Json(booking.into()))
}

/// `GET /api/bookings` - list the caller's bookings, newest first.
pub async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list_own(&actor).await?;
    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}
