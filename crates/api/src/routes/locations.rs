//! Location ingress endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::{BatchResult, LocationPing, TripStatus};

/// Acknowledgement for a synchronously processed ping.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAck {
    pub success: bool,
    pub trip_status: TripStatus,
    pub total_distance_km: f64,
}

/// Acknowledgement for an accepted asynchronous ping.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncAck {
    pub accepted: bool,
}

/// POST /location/update
///
/// Processes the ping before responding; failures surface to the caller.
pub async fn update(
    State(state): State<AppState>,
    Json(ping): Json<LocationPing>,
) -> Result<Json<LocationAck>, ApiError> {
    let trip = state.dispatcher.sync(&ping).await?;

    info!(
        trip_id = %trip.id,
        vehicle_id = %ping.vehicle_id,
        status = %trip.status,
        "Location update processed"
    );

    Ok(Json(LocationAck {
        success: true,
        trip_status: trip.status,
        total_distance_km: trip.total_distance_km,
    }))
}

/// POST /location/update/async
///
/// Validates and enqueues; processing failures are logged, not surfaced.
pub async fn update_async(
    State(state): State<AppState>,
    Json(ping): Json<LocationPing>,
) -> Result<(StatusCode, Json<AsyncAck>), ApiError> {
    state.dispatcher.enqueue(ping).await?;
    Ok((StatusCode::ACCEPTED, Json(AsyncAck { accepted: true })))
}

/// POST /location/batch
///
/// Applies the batch in device-timestamp order; per-ping failures are
/// counted, not fatal.
pub async fn batch(
    State(state): State<AppState>,
    Json(pings): Json<Vec<LocationPing>>,
) -> Result<Json<BatchResult>, ApiError> {
    let result = state.dispatcher.batch(pings).await?;

    info!(
        total = result.total,
        processed = result.processed,
        failed = result.failed,
        "Location batch processed"
    );

    Ok(Json(result))
}
