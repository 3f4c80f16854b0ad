//! Router assembly.

use crate::handlers::{bookings, events, health};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the application router.
///
/// `/health` is unauthenticated; everything under `/api` goes through the
/// auth extractors.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:id",
            get(events::get_event).put(events::update_event),
        )
        .route("/events/:id/status", put(events::moderate_event))
        .route("/events/:id/resubmit", post(events::resubmit_event))
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", put(bookings::cancel_booking));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
