//! Audit log projections.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::EventLog;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub events: Vec<EventLog>,
    pub total: usize,
}

impl From<Vec<EventLog>> for AuditResponse {
    fn from(events: Vec<EventLog>) -> Self {
        let total = events.len();
        Self { events, total }
    }
}

/// Time range, ISO-8601 local datetimes, interpreted as UTC.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

/// GET /audit/trip/:trip_id — chronological, oldest first.
pub async fn by_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<AuditResponse>, ApiError> {
    let events = state.audit.by_trip(trip_id).await?;
    Ok(Json(events.into()))
}

/// GET /audit/vehicle/:vehicle_id — newest first.
pub async fn by_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<AuditResponse>, ApiError> {
    let events = state.audit.by_vehicle(vehicle_id).await?;
    Ok(Json(events.into()))
}

/// GET /audit/events?from=&to= — chronological; `from ≤ to` required.
pub async fn by_time_range(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<AuditResponse>, ApiError> {
    let events = state
        .audit
        .by_time_range(range.from.and_utc(), range.to.and_utc())
        .await?;
    Ok(Json(events.into()))
}
