//! Bearer-token sessions.
//!
//! [`require_session`] verifies the token and stores the [`SessionClaims`]
//! in request extensions; [`maintenance_only`] then gates on the role claim.
//! Handlers behind them read `Extension<SessionClaims>`.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use domains::{DomainError, SessionClaims};

use crate::error::ApiError;
use crate::router::AppState;

/// The raw token of the current request, kept for logout.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| DomainError::Unauthorized("missing bearer token".into()))?
        .to_string();

    let claims = state.auth.authorize(&token).await?;
    tracing::debug!(user_id = %claims.user_id, role = %claims.role, "session verified");

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}

pub async fn maintenance_only(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<SessionClaims>()
        .ok_or_else(|| DomainError::Unauthorized("no session".into()))?;
    services::require_maintenance(claims)?;
    Ok(next.run(req).await)
}
