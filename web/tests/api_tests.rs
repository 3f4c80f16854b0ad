//! End-to-end API tests against the in-memory store.
//!
//! Each test wires the full router with `MemoryStore` and a static token
//! authority, then drives it over HTTP via `axum-test`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum_test::TestServer;
use chrono::{Duration, Utc};
use http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use ticketline_core::{
    Actor, BookingService, EventService, InventoryLedger, MemoryStore, Role, SystemClock, UserId,
};
use ticketline_web::{AppState, StaticTokenAuthority, build_router};

const ORGANIZER_TOKEN: &str = "organizer-token";
const OTHER_ORGANIZER_TOKEN: &str = "other-organizer-token";
const ADMIN_TOKEN: &str = "admin-token";
const USER_TOKEN: &str = "user-token";

fn server() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(InventoryLedger::new(store.clone()));
    let clock = Arc::new(SystemClock);
    let events = Arc::new(EventService::new(store.clone(), ledger.clone(), clock.clone()));
    let bookings = Arc::new(BookingService::new(store, ledger, clock));

    let auth = StaticTokenAuthority::new()
        .with_token(ORGANIZER_TOKEN, Actor::new(UserId::new(), Role::Organizer))
        .with_token(
            OTHER_ORGANIZER_TOKEN,
            Actor::new(UserId::new(), Role::Organizer),
        )
        .with_token(ADMIN_TOKEN, Actor::new(UserId::new(), Role::Admin))
        .with_token(USER_TOKEN, Actor::new(UserId::new(), Role::User));

    let state = AppState::new(events, bookings, Arc::new(auth));
    TestServer::new(build_router(state)).expect("test server")
}

fn event_body(total_tickets: u32, price_cents: u64) -> Value {
    json!({
        "title": "Jazz Night",
        "description": "An evening of live jazz",
        "starts_at": Utc::now() + Duration::days(30),
        "location": "Blue Note",
        "category": "music",
        "image_url": null,
        "ticket_price_cents": price_cents,
        "total_tickets": total_tickets,
    })
}

/// Creates an event as the organizer and approves it as the admin,
/// returning the event id.
async fn approved_event(server: &TestServer, total_tickets: u32, price_cents: u64) -> String {
    let response = server
        .post("/api/events")
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&event_body(total_tickets, price_cents))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let response = server
        .put(&format!("/api/events/{id}/status"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "decision": "approved" }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);
    id
}

fn booking_body(event_id: &str, ticket_type: &str, quantity: u32) -> Value {
    json!({
        "event_id": event_id,
        "ticket_type": ticket_type,
        "quantity": quantity,
        "contact": { "name": "Ada", "email": "ada@example.com", "phone": null },
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn event_submission_requires_a_session() {
    let server = server();
    let response = server.post("/api/events").json(&event_body(10, 1000)).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn an_unknown_token_is_rejected_not_downgraded() {
    let server = server();
    let response = server
        .get("/api/events")
        .authorization_bearer("no-such-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn plain_users_may_not_submit_events() {
    let server = server();
    let response = server
        .post("/api/events")
        .authorization_bearer(USER_TOKEN)
        .json(&event_body(10, 1000))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_events_are_hidden_until_approved() {
    let server = server();
    let response = server
        .post("/api/events")
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&event_body(10, 1000))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["remaining_tickets"], 10);
    let id = body["id"].as_str().unwrap().to_string();

    // Invisible to the public and unrelated users.
    let listed = server.get("/api/events").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 0);
    server
        .get(&format!("/api/events/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/events/{id}"))
        .authorization_bearer(USER_TOKEN)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Visible to the owner and to admins.
    server
        .get(&format!("/api/events/{id}"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/events/{id}"))
        .authorization_bearer(ADMIN_TOKEN)
        .await
        .assert_status_ok();

    // Moderation is admin-only.
    server
        .put(&format!("/api/events/{id}/status"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&json!({ "decision": "approved" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .put(&format!("/api/events/{id}/status"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "decision": "approved" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let listed = server.get("/api/events").await.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"].as_str().unwrap(), id);
}

#[tokio::test]
async fn vip_bookings_cost_twice_the_base_price() {
    let server = server();
    let event_id = approved_event(&server, 20, 2000).await;

    let response = server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "vip", 3))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["unit_price_cents"], 4000);
    assert_eq!(body["total_amount_cents"], 12000);
    assert_eq!(body["status"], "confirmed");

    let event = server
        .get(&format!("/api/events/{event_id}"))
        .await
        .json::<Value>();
    assert_eq!(event["remaining_tickets"], 17);
}

#[tokio::test]
async fn overbooking_is_a_conflict() {
    let server = server();
    let event_id = approved_event(&server, 5, 1000).await;

    server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "standard", 4))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "standard", 2))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // The rejected booking held nothing.
    let event = server
        .get(&format!("/api/events/{event_id}"))
        .await
        .json::<Value>();
    assert_eq!(event["remaining_tickets"], 1);
}

#[tokio::test]
async fn pending_events_reject_bookings() {
    let server = server();
    let response = server
        .post("/api/events")
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&event_body(10, 1000))
        .await;
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    // The owner can see the pending event but still cannot book it.
    let response = server
        .post("/api/bookings")
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&booking_body(&id, "standard", 1))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cancellation_returns_tickets_exactly_once() {
    let server = server();
    let event_id = approved_event(&server, 10, 1000).await;

    let booking = server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "standard", 4))
        .await
        .json::<Value>();
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // Other users cannot cancel it.
    server
        .put(&format!("/api/bookings/{booking_id}/cancel"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .put(&format!("/api/bookings/{booking_id}/cancel"))
        .authorization_bearer(USER_TOKEN)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Second cancel is idempotent at the inventory level: a conflict, and no
    // double release.
    server
        .put(&format!("/api/bookings/{booking_id}/cancel"))
        .authorization_bearer(USER_TOKEN)
        .await
        .assert_status(StatusCode::CONFLICT);

    let event = server
        .get(&format!("/api/events/{event_id}"))
        .await
        .json::<Value>();
    assert_eq!(event["remaining_tickets"], 10);
}

#[tokio::test]
async fn users_list_only_their_own_bookings() {
    let server = server();
    let event_id = approved_event(&server, 10, 1000).await;

    server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "standard", 2))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/bookings")
        .authorization_bearer(OTHER_ORGANIZER_TOKEN)
        .json(&booking_body(&event_id, "standard", 1))
        .await
        .assert_status(StatusCode::CREATED);

    let mine = server
        .get("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .await
        .json::<Value>();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["quantity"], 2);
}

#[tokio::test]
async fn declined_events_can_be_resubmitted_by_their_owner() {
    let server = server();
    let response = server
        .post("/api/events")
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&event_body(10, 1000))
        .await;
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    server
        .put(&format!("/api/events/{id}/status"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "decision": "declined" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Only the owning organizer may resubmit.
    server
        .post(&format!("/api/events/{id}/resubmit"))
        .authorization_bearer(OTHER_ORGANIZER_TOKEN)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post(&format!("/api/events/{id}/resubmit"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let event = server
        .get(&format!("/api/events/{id}"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .await
        .json::<Value>();
    assert_eq!(event["status"], "pending");

    // Resubmitting a pending event is a rule violation.
    server
        .post(&format!("/api/events/{id}/resubmit"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn capacity_edits_respect_held_tickets() {
    let server = server();
    let event_id = approved_event(&server, 10, 1000).await;

    server
        .post("/api/bookings")
        .authorization_bearer(USER_TOKEN)
        .json(&booking_body(&event_id, "standard", 6))
        .await
        .assert_status(StatusCode::CREATED);

    // Shrinking below the 6 held tickets is rejected.
    server
        .put(&format!("/api/events/{event_id}"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&json!({ "total_tickets": 5 }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = server
        .put(&format!("/api/events/{event_id}"))
        .authorization_bearer(ORGANIZER_TOKEN)
        .json(&json!({ "total_tickets": 8, "title": "Jazz Night (small room)" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["total_tickets"], 8);
    assert_eq!(body["remaining_tickets"], 2);
    assert_eq!(body["title"], "Jazz Night (small room)");
}
