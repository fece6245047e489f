use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{
    claims::Claims,
    services::{self, Identity, Role},
};
use crate::{error::AppError, state::AppState};

fn auth_header(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// Authenticated caller; rejects with 401.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (identity, _) = services::resolve_identity(state, auth_header(parts)).await?;
        Ok(AuthUser(identity))
    }
}

/// Identity plus the verified access-token claims, for logout.
pub struct Session {
    pub identity: Identity,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (identity, claims) = services::resolve_identity(state, auth_header(parts)).await?;
        Ok(Session { identity, claims })
    }
}

/// Caller if a valid token was sent, otherwise anonymous. Never rejects.
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            services::optional_identity(state, auth_header(parts)).await,
        ))
    }
}

/// Authenticated caller with the `ADMIN` role; 401 or 403 otherwise.
pub struct RequireAdmin(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (identity, _) = services::resolve_identity(state, auth_header(parts)).await?;
        services::authorize(Some(&identity), &[Role::Admin])?;
        Ok(RequireAdmin(identity))
    }
}
