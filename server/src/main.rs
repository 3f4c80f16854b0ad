//! Ticketline HTTP server.
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies the schema
//! - Wires the inventory ledger and the booking/event services
//! - Serves the HTTP API until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! # Start infrastructure
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin ticketline-server
//! ```

mod config;

use crate::config::Config;
use std::sync::Arc;
use ticketline_core::{Actor, BookingService, EventService, InventoryLedger, Role, SystemClock, UserId};
use ticketline_postgres::PostgresTicketStore;
use ticketline_web::{AppState, StaticTokenAuthority, build_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Builds the session authority from the configured development tokens.
fn session_authority(config: &Config) -> StaticTokenAuthority {
    let mut authority = StaticTokenAuthority::new();
    if let Some(token) = &config.auth.admin_token {
        authority = authority.with_token(token.clone(), Actor::new(UserId::new(), Role::Admin));
    }
    if let Some(token) = &config.auth.organizer_token {
        authority = authority.with_token(token.clone(), Actor::new(UserId::new(), Role::Organizer));
    }
    if let Some(token) = &config.auth.user_token {
        authority = authority.with_token(token.clone(), Actor::new(UserId::new(), Role::User));
    }
    authority
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticketline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ticketline server...");

    let config = Config::from_env();
    tracing::info!(postgres = %config.postgres.url, "Configuration loaded");

    let store = Arc::new(
        PostgresTicketStore::connect(&config.postgres.url, config.postgres.max_connections)
            .await?,
    );
    store.ensure_schema().await?;
    tracing::info!("Database schema ready");

    let clock = Arc::new(SystemClock);
    let ledger = Arc::new(InventoryLedger::new(store.clone()));
    let events = Arc::new(EventService::new(store.clone(), ledger.clone(), clock.clone()));
    let bookings = Arc::new(
        BookingService::new(store, ledger, clock).with_cancellation_cutoff(
            chrono::Duration::hours(config.booking.cancellation_cutoff_hours),
        ),
    );

    let state = AppState::new(events, bookings, Arc::new(session_authority(&config)));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down gracefully...");
        })
        .await?;

    Ok(())
}
