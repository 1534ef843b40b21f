//! Office geofence CRUD.
//!
//! Every write evicts the geofence cache so the engine sees the change on
//! the next ping.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::office_geofence::OfficeGeofenceRequest;
use domain::models::OfficeGeofence;
use domain::ports::store::Store;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGeofencesResponse {
    pub geofences: Vec<OfficeGeofence>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /geofences
pub async fn list(State(state): State<AppState>) -> Result<Json<ListGeofencesResponse>, ApiError> {
    let geofences = state.store.list_geofences().await?;
    let total = geofences.len();
    Ok(Json(ListGeofencesResponse { geofences, total }))
}

/// GET /geofences/:geofence_id
pub async fn get_one(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<OfficeGeofence>, ApiError> {
    let geofence = state
        .store
        .find_geofence(geofence_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Geofence {geofence_id} not found")))?;
    Ok(Json(geofence))
}

/// POST /geofences
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<OfficeGeofenceRequest>,
) -> Result<(StatusCode, Json<OfficeGeofence>), ApiError> {
    request.validate()?;
    request.validate_shape()?;

    let geofence = state
        .store
        .insert_geofence(request.into_geofence(Uuid::new_v4()))
        .await?;
    state.static_data.evict_geofences();

    info!(geofence_id = %geofence.id, shape = %geofence.shape, "Geofence created");
    Ok((StatusCode::CREATED, Json(geofence)))
}

/// PUT /geofences/:geofence_id
pub async fn update(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
    Json(request): Json<OfficeGeofenceRequest>,
) -> Result<Json<OfficeGeofence>, ApiError> {
    request.validate()?;
    request.validate_shape()?;

    let geofence = state
        .store
        .update_geofence(request.into_geofence(geofence_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Geofence {geofence_id} not found")))?;
    state.static_data.evict_geofences();

    info!(geofence_id = %geofence.id, "Geofence updated");
    Ok(Json(geofence))
}

/// DELETE /geofences/:geofence_id
pub async fn remove(
    State(state): State<AppState>,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.store.delete_geofence(geofence_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "Geofence {geofence_id} not found"
        )));
    }
    state.static_data.evict_geofences();

    info!(geofence_id = %geofence_id, "Geofence deleted");
    Ok(Json(DeleteResponse { success: true }))
}
