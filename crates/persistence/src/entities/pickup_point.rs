//! Pickup point entity (database row mapping).

use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{PickupPoint, PickupStatus};
use domain::Error;

/// Database row mapping for the pickup_points table.
#[derive(Debug, Clone, FromRow)]
pub struct PickupPointEntity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub status: String,
}

impl PickupPointEntity {
    pub fn into_domain(self) -> domain::Result<PickupPoint> {
        let status: PickupStatus = self
            .status
            .parse()
            .map_err(|e: String| Error::Storage(e))?;
        Ok(PickupPoint {
            id: self.id,
            trip_id: self.trip_id,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius_meters,
            status,
        })
    }
}
