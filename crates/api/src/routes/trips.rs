//! Trip administration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::trip::{ManualCloseRequest, TripResponse};

/// POST /trip/:trip_id/manual-close
pub async fn manual_close(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<ManualCloseRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    request.validate()?;

    let trip = state.coordinator.manual_close(trip_id, &request).await?;
    Ok(Json(TripResponse::from(trip)))
}
