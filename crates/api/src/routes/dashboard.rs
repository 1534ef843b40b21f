//! Dashboard endpoints: trip lifecycle controls and the aggregate pull view.
//!
//! The pull path reads the store; the live push path is the event bus, which
//! emits after commit. Both coexist so a dashboard can poll or subscribe.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::trip::TripResponse;
use domain::models::{PickupStatus, TripStatus};
use domain::ports::store::Store;

/// One trip with its live context for the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTrip {
    pub trip_id: Uuid,
    pub vehicle_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_registration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    pub status: TripStatus,
    pub total_distance_km: f64,
    pub pickups_total: usize,
    pub pickups_arrived: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub trips: Vec<DashboardTrip>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub trips_reset: usize,
}

/// POST /dashboard/start-trip/:trip_id
pub async fn start_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip = state.coordinator.start_trip(trip_id).await?;
    Ok(Json(TripResponse::from(trip)))
}

/// POST /dashboard/reset
pub async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let trips_reset = state.coordinator.reset_all().await?;
    Ok(Json(ResetResponse {
        success: true,
        trips_reset,
    }))
}

/// GET /dashboard/data
pub async fn data(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let trips = state.store.list_trips().await?;

    let mut views = Vec::with_capacity(trips.len());
    for trip in trips {
        let pickups = state.store.pickups_for_trip(trip.id).await?;
        let latest = state.store.latest_location(trip.id).await?;
        let registration = state.static_data.registration_for(trip.vehicle_id).await?;
        let driver = state.static_data.driver_for_vehicle(trip.vehicle_id).await?;

        let pickups_total = pickups.len();
        let pickups_arrived = pickups
            .iter()
            .filter(|p| p.status == PickupStatus::Arrived)
            .count();

        views.push(DashboardTrip {
            trip_id: trip.id,
            vehicle_id: trip.vehicle_id,
            vehicle_registration: registration,
            driver_name: driver.map(|d| d.name),
            status: trip.status,
            total_distance_km: trip.total_distance_km,
            pickups_total,
            pickups_arrived,
            last_latitude: latest.as_ref().map(|l| l.latitude),
            last_longitude: latest.as_ref().map(|l| l.longitude),
            last_seen_at: latest.map(|l| l.recorded_at),
        });
    }

    let total = views.len();
    Ok(Json(DashboardResponse {
        trips: views,
        total,
    }))
}
