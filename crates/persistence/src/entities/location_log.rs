//! Location log entity (database row mapping).

use chrono::NaiveDateTime;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::LocationLog;

/// Database row mapping for the location_logs table. `recorded_at` is the
/// device timestamp, stored without a timezone.
#[derive(Debug, Clone, FromRow)]
pub struct LocationLogEntity {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub recorded_at: NaiveDateTime,
}

impl From<LocationLogEntity> for LocationLog {
    fn from(entity: LocationLogEntity) -> Self {
        Self {
            id: entity.id,
            vehicle_id: entity.vehicle_id,
            trip_id: entity.trip_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            speed_kmh: entity.speed_kmh,
            recorded_at: entity.recorded_at,
        }
    }
}
