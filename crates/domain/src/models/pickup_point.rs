//! Pickup point domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geo::{self, GeoPoint};

/// Status of a pickup stop within a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickupStatus {
    Pending,
    Arrived,
}

impl PickupStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "PENDING",
            PickupStatus::Arrived => "ARRIVED",
        }
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PickupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PickupStatus::Pending),
            "ARRIVED" => Ok(PickupStatus::Arrived),
            _ => Err(format!(
                "Invalid pickup status: {}. Must be one of: PENDING, ARRIVED",
                s
            )),
        }
    }
}

/// A circular pickup geofence owned by exactly one trip. Deleted (reset to
/// PENDING) together with its trip on admin reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupPoint {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub status: PickupStatus,
}

impl PickupPoint {
    pub fn centre(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Whether a ping position falls inside this pickup's circle.
    pub fn contains(&self, point: GeoPoint) -> bool {
        geo::inside_circle(point, self.centre(), self.radius_meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pickup_status_round_trip() {
        assert_eq!(PickupStatus::Pending.as_str(), "PENDING");
        assert_eq!(
            "ARRIVED".parse::<PickupStatus>().unwrap(),
            PickupStatus::Arrived
        );
        assert!("arrived".parse::<PickupStatus>().is_err());
    }

    #[test]
    fn test_pickup_containment() {
        let pickup = PickupPoint {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            latitude: 12.9520,
            longitude: 77.5750,
            radius_meters: 50.0,
            status: PickupStatus::Pending,
        };
        assert!(pickup.contains(GeoPoint::new(12.9520, 77.5750)));
        assert!(!pickup.contains(GeoPoint::new(12.9716, 77.5946)));
    }
}
