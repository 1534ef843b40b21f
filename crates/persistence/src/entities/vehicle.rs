//! Vehicle and driver entities (database row mappings).

use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Driver, Vehicle, VehicleStatus};
use domain::Error;

/// Database row mapping for the vehicles table.
#[derive(Debug, Clone, FromRow)]
pub struct VehicleEntity {
    pub id: Uuid,
    pub registration: String,
    pub status: String,
}

impl VehicleEntity {
    pub fn into_domain(self) -> domain::Result<Vehicle> {
        let status: VehicleStatus = self
            .status
            .parse()
            .map_err(|e: String| Error::Storage(e))?;
        Ok(Vehicle {
            id: self.id,
            registration: self.registration,
            status,
        })
    }
}

/// Database row mapping for the drivers table.
#[derive(Debug, Clone, FromRow)]
pub struct DriverEntity {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub licence_number: String,
    pub vehicle_id: Option<Uuid>,
}

impl From<DriverEntity> for Driver {
    fn from(entity: DriverEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            phone: entity.phone,
            licence_number: entity.licence_number,
            vehicle_id: entity.vehicle_id,
        }
    }
}
