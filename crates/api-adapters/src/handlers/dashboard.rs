//! Maintenance dashboard: counts over everything plus the filtered list.

use axum::extract::State;
use axum::response::sse::Event;
use axum::response::IntoResponse;
use axum::Json;
use domains::ListScope;
use serde::Deserialize;
use services::{DashboardFilter, DashboardSnapshot};

use super::sse::snapshot_stream;
use crate::error::ApiError;
use crate::extract::QueryParams;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl DashboardQuery {
    fn filter(&self) -> Result<DashboardFilter, ApiError> {
        Ok(DashboardFilter::parse(
            self.search.as_deref(),
            self.category.as_deref(),
            self.status.as_deref(),
            self.priority.as_deref(),
        )?)
    }
}

pub async fn snapshot(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DashboardQuery>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let filter = query.filter()?;
    Ok(Json(state.complaints.dashboard(&filter).await?))
}

pub async fn stream(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.filter()?;
    let subscription = state.complaints.subscribe(ListScope::All);
    Ok(snapshot_stream(subscription, state.shutdown.clone(), move |all| {
        Event::default()
            .event("dashboard")
            .json_data(DashboardSnapshot::project(&all, &filter))
    }))
}
