//! Submission, my-complaints, detail and status updates.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::{Extension, Json};
use domains::{Complaint, DomainError, ListScope, SessionClaims, Status};
use serde::Deserialize;
use services::ComplaintDraft;
use uuid::Uuid;

use super::sse::snapshot_stream;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    JsonBody(draft): JsonBody<ComplaintDraft>,
) -> Result<(StatusCode, Json<Complaint>), ApiError> {
    let complaint = state.complaints.submit(Some(claims.user_id), draft).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// The caller's own complaints, newest first.
pub async fn mine(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let list = state.complaints.list(ListScope::SubmittedBy(claims.user_id)).await?;
    Ok(Json(list))
}

pub async fn mine_stream(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> impl axum::response::IntoResponse {
    let subscription = state.complaints.subscribe(ListScope::SubmittedBy(claims.user_id));
    snapshot_stream(subscription, state.shutdown.clone(), |snapshot| {
        Event::default().event("complaints").json_data(snapshot)
    })
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Complaint>, ApiError> {
    Ok(Json(state.complaints.get_for(&claims, id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<Complaint>, ApiError> {
    let next: Status = update.status.parse().map_err(DomainError::Validation)?;
    let updated = state.complaints.update_status_as(&claims, id, next).await?;
    Ok(Json(updated))
}
