//! Event lifecycle endpoints: submission, moderation, edits, listing.

use crate::auth::{CurrentUser, MaybeUser, RequireAdmin};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketline_core::{
    Event, EventDraft, EventId, EventPatch, ModerationDecision, ModerationStatus, Money,
};
use uuid::Uuid;

/// Request body for `POST /api/events`.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// Venue / location
    pub location: String,
    /// Category label
    pub category: String,
    /// Optional image reference
    pub image_url: Option<String>,
    /// Base ticket price in cents
    pub ticket_price_cents: u64,
    /// Total ticket capacity
    pub total_tickets: u32,
}

/// Request body for `PUT /api/events/:id`. All fields optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    /// Updated title
    pub title: Option<String>,
    /// Updated description
    pub description: Option<String>,
    /// Updated start time
    pub starts_at: Option<DateTime<Utc>>,
    /// Updated location
    pub location: Option<String>,
    /// Updated category
    pub category: Option<String>,
    /// Updated image reference
    pub image_url: Option<String>,
    /// Updated base price in cents
    pub ticket_price_cents: Option<u64>,
    /// Updated capacity, applied through the inventory ledger
    pub total_tickets: Option<u32>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            starts_at: req.starts_at,
            location: req.location,
            category: req.category,
            image_url: req.image_url,
            ticket_price: req.ticket_price_cents.map(Money::from_cents),
            total_tickets: req.total_tickets,
        }
    }
}

/// Request body for `PUT /api/events/:id/status`.
#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    /// `approved` or `declined`
    pub decision: ModerationDecision,
}

/// Query parameters for `GET /api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// Narrow the listing to one moderation state
    pub status: Option<ModerationStatus>,
}

/// Event representation returned to clients.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event ID
    pub id: EventId,
    /// Owning organizer
    pub organizer_id: ticketline_core::UserId,
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// Venue / location
    pub location: String,
    /// Category label
    pub category: String,
    /// Optional image reference
    pub image_url: Option<String>,
    /// Base ticket price in cents
    pub ticket_price_cents: u64,
    /// Total ticket capacity
    pub total_tickets: u32,
    /// Tickets still available
    pub remaining_tickets: u32,
    /// Moderation state
    pub status: ModerationStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            organizer_id: event.organizer_id,
            title: event.title,
            description: event.description,
            starts_at: event.starts_at,
            location: event.location,
            category: event.category,
            image_url: event.image_url,
            ticket_price_cents: event.ticket_price.cents(),
            total_tickets: event.total_tickets,
            remaining_tickets: event.remaining_tickets,
            status: event.status,
            created_at: event.created_at,
        }
    }
}

/// `POST /api/events` - submit a new event for moderation.
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    let draft = EventDraft {
        title: request.title,
        description: request.description,
        starts_at: request.starts_at,
        location: request.location,
        category: request.category,
        image_url: request.image_url,
        ticket_price: Money::from_cents(request.ticket_price_cents),
        total_tickets: request.total_tickets,
    };
    let event = state.events.submit(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

/// `GET /api/events` - list events visible to the caller.
pub async fn list_events(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.events.list(viewer.as_ref(), query.status).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// `GET /api/events/:id` - fetch one event, subject to visibility.
pub async fn get_event(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state
        .events
        .fetch(viewer.as_ref(), EventId::from_uuid(id))
        .await?;
    Ok(Json(event.into()))
}

/// `PUT /api/events/:id` - edit content and capacity.
pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state
        .events
        .edit_content(&actor, EventId::from_uuid(id), request.into())
        .await?;
    Ok(Json(event.into()))
}

/// `PUT /api/events/:id/status` - approve or decline a pending event.
pub async fn moderate_event(
    State(state): State<AppState>,
    RequireAdmin(actor): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerateRequest>,
) -> Result<StatusCode, AppError> {
    state
        .events
        .moderate(&actor, EventId::from_uuid(id), request.decision)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/events/:id/resubmit` - reset a declined event to pending.
pub async fn resubmit_event(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .events
        .resubmit(&actor, EventId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
