//! Session resolution and authentication extractors.
//!
//! Handlers never parse credentials themselves: they take a [`CurrentUser`]
//! (required session), [`MaybeUser`] (optional session, for public reads
//! with owner/admin visibility), or [`RequireAdmin`] parameter and receive
//! a resolved [`Actor`].
//!
//! Admins are ordinary users carrying the admin role; there is no separate
//! admin credential path, so [`RequireAdmin`] is just [`CurrentUser`] plus a
//! role check.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::collections::HashMap;
use ticketline_core::Actor;

/// Resolves a bearer token to an authenticated actor.
///
/// The production implementation would sit on a session store; tests and
/// local development use [`StaticTokenAuthority`].
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Resolve a bearer token, returning `None` for unknown or expired
    /// sessions.
    async fn resolve(&self, token: &str) -> Option<Actor>;
}

/// Token-to-actor map for tests and local development.
#[derive(Debug, Default)]
pub struct StaticTokenAuthority {
    tokens: HashMap<String, Actor>,
}

impl StaticTokenAuthority {
    /// Creates an empty authority.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for the given actor.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, actor: Actor) -> Self {
        self.tokens.insert(token.into(), actor);
        self
    }
}

#[async_trait]
impl SessionAuthority for StaticTokenAuthority {
    async fn resolve(&self, token: &str) -> Option<Actor> {
        self.tokens.get(token).copied()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_actor<S>(parts: &Parts, state: &S) -> Result<Option<Actor>, AppError>
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    let Some(token) = bearer_token(&parts.headers) else {
        return Ok(None);
    };
    let app = AppState::from_ref(state);
    let actor = app
        .auth
        .resolve(token)
        .await
        .ok_or_else(|| AppError::unauthorized("Invalid or expired session token"))?;
    Ok(Some(actor))
}

/// The authenticated caller. Rejects with 401 when no valid session is
/// presented.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = resolve_actor(parts, state)
            .await?
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;
        Ok(Self(actor))
    }
}

/// An optional caller for endpoints with public reads.
///
/// No header resolves to anonymous; a malformed or unknown token is still a
/// 401 rather than a silent downgrade to anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_actor(parts, state).await?))
    }
}

/// The authenticated caller, required to hold the admin role.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(actor) = CurrentUser::from_request_parts(parts, state).await?;
        if !actor.is_admin() {
            return Err(AppError::forbidden("Administrator role required"));
        }
        Ok(Self(actor))
    }
}
