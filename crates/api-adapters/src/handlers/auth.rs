//! Signup, login and logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use domains::Role;
use serde::Serialize;
use services::{Landing, LoginRequest, SignupRequest};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::router::AppState;
use crate::session::BearerToken;

/// Where the client goes next, as both the symbolic page and its path.
#[derive(Debug, Serialize)]
pub struct Redirect {
    pub landing: Landing,
    pub path: &'static str,
}

impl From<Landing> for Redirect {
    fn from(landing: Landing) -> Self {
        Self { landing, path: landing.path() }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub redirect: Redirect,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub redirect: Redirect,
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let outcome = state.auth.signup(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: outcome.user.id,
            email: outcome.user.email,
            role: outcome.user.role,
            redirect: outcome.landing.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state.auth.login(req).await?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        user_id: outcome.claims.user_id,
        role: outcome.claims.role,
        expires_at: outcome.claims.expires_at,
        redirect: outcome.landing.into(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<Redirect>, ApiError> {
    let landing = state.auth.logout(&token).await?;
    Ok(Json(landing.into()))
}
