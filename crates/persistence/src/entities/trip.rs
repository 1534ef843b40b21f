//! Trip entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Trip, TripStatus};
use domain::Error;

/// Database row mapping for the trips table.
#[derive(Debug, Clone, FromRow)]
pub struct TripEntity {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance_km: f64,
    pub duration_minutes: Option<i64>,
    pub office_entry_time: Option<DateTime<Utc>>,
}

impl TripEntity {
    /// Converts the row into the domain model; an unknown status string is a
    /// storage-level corruption, not a caller error.
    pub fn into_domain(self) -> domain::Result<Trip> {
        let status: TripStatus = self
            .status
            .parse()
            .map_err(|e: String| Error::Storage(e))?;
        Ok(Trip {
            id: self.id,
            vehicle_id: self.vehicle_id,
            status,
            start_time: self.start_time,
            end_time: self.end_time,
            total_distance_km: self.total_distance_km,
            duration_minutes: self.duration_minutes,
            office_entry_time: self.office_entry_time,
        })
    }
}
