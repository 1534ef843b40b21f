//! Vehicle domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,
    Inactive,
}

impl VehicleStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(VehicleStatus::Active),
            "INACTIVE" => Ok(VehicleStatus::Inactive),
            _ => Err(format!(
                "Invalid vehicle status: {}. Must be one of: ACTIVE, INACTIVE",
                s
            )),
        }
    }
}

/// A vehicle in the fleet. Read-mostly; identified externally by its
/// registration string, which is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub registration: String,
    pub status: VehicleStatus,
}
