//! Axum HTTP boundary for the ticketline system.
//!
//! The domain services in `ticketline-core` know nothing about HTTP; this
//! crate translates requests into domain calls and domain errors into JSON
//! error responses.
//!
//! # Request flow
//!
//! 1. The auth extractor resolves the bearer token to an [`Actor`]
//!    (`ticketline_core::Actor`) via the [`auth::SessionAuthority`].
//! 2. The handler parses the body/query into a domain request.
//! 3. The matching service method runs the business rules.
//! 4. The result serializes to JSON; a `CoreError` maps through
//!    [`AppError`] to the right status code.
//!
//! [`Actor`]: ticketline_core::Actor

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{CurrentUser, MaybeUser, RequireAdmin, SessionAuthority, StaticTokenAuthority};
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
