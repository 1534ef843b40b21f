//! Location ping ingestion DTOs and the append-only location log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::geo::GeoPoint;

/// An incoming GPS ping. The `timestamp` is the device clock, ISO-8601 local
/// datetime; the server never uses it for audit rows or dwell arithmetic.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationPing {
    pub vehicle_id: Uuid,

    pub trip_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed_kmh: f64,

    pub timestamp: NaiveDateTime,
}

impl LocationPing {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// One row of the append-only ping history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLog {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    /// Device timestamp of the ping.
    pub recorded_at: NaiveDateTime,
}

impl LocationLog {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Input data for appending a location log row.
#[derive(Debug, Clone)]
pub struct NewLocationLog {
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub recorded_at: NaiveDateTime,
}

impl From<&LocationPing> for NewLocationLog {
    fn from(ping: &LocationPing) -> Self {
        Self {
            vehicle_id: ping.vehicle_id,
            trip_id: ping.trip_id,
            latitude: ping.latitude,
            longitude: ping.longitude,
            speed_kmh: ping.speed_kmh,
            recorded_at: ping.timestamp,
        }
    }
}

/// Outcome summary of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}
