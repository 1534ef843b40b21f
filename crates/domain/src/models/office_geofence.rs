//! Office (terminal) geofence domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::geo::{self, GeoPoint};

/// Geofence boundary shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceShape {
    Circular,
    Polygon,
}

impl GeofenceShape {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceShape::Circular => "CIRCULAR",
            GeofenceShape::Polygon => "POLYGON",
        }
    }
}

impl fmt::Display for GeofenceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GeofenceShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CIRCULAR" => Ok(GeofenceShape::Circular),
            "POLYGON" => Ok(GeofenceShape::Polygon),
            _ => Err(format!(
                "Invalid geofence shape: {}. Must be one of: CIRCULAR, POLYGON",
                s
            )),
        }
    }
}

/// A terminal geofence around an office. Immutable at runtime except through
/// the admin API; served to the engine through the static-data cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeGeofence {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub shape: GeofenceShape,
    /// Ordered vertices; only meaningful when `shape` is `POLYGON`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<GeoPoint>,
}

impl OfficeGeofence {
    pub fn centre(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Containment test dispatched on the boundary shape.
    pub fn contains(&self, point: GeoPoint) -> bool {
        match self.shape {
            GeofenceShape::Circular => geo::inside_circle(point, self.centre(), self.radius_meters),
            GeofenceShape::Polygon => geo::inside_polygon(point, &self.polygon),
        }
    }
}

fn default_shape() -> GeofenceShape {
    GeofenceShape::Circular
}

/// Request payload for creating or replacing a geofence.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OfficeGeofenceRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_radius"))]
    pub radius_meters: f64,

    #[serde(default = "default_shape")]
    pub shape: GeofenceShape,

    #[serde(default)]
    pub polygon: Vec<GeoPoint>,
}

impl OfficeGeofenceRequest {
    /// Shape-dependent validation that `validator` field rules cannot express:
    /// a POLYGON geofence needs at least 3 vertices.
    pub fn validate_shape(&self) -> Result<(), crate::Error> {
        if self.shape == GeofenceShape::Polygon && self.polygon.len() < 3 {
            return Err(crate::Error::Validation(
                "Polygon geofences require at least 3 vertices".to_string(),
            ));
        }
        Ok(())
    }

    /// Materializes the request into a geofence with the given id.
    pub fn into_geofence(self, id: Uuid) -> OfficeGeofence {
        let polygon = match self.shape {
            GeofenceShape::Polygon => self.polygon,
            GeofenceShape::Circular => Vec::new(),
        };
        OfficeGeofence {
            id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius_meters,
            shape: self.shape,
            polygon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular(lat: f64, lon: f64, radius: f64) -> OfficeGeofence {
        OfficeGeofence {
            id: Uuid::new_v4(),
            name: Some("HQ".to_string()),
            latitude: lat,
            longitude: lon,
            radius_meters: radius,
            shape: GeofenceShape::Circular,
            polygon: Vec::new(),
        }
    }

    #[test]
    fn test_circular_containment() {
        let fence = circular(12.9716, 77.5946, 100.0);
        assert!(fence.contains(GeoPoint::new(12.9716, 77.5946)));
        assert!(!fence.contains(GeoPoint::new(12.9800, 77.6050)));
    }

    #[test]
    fn test_polygon_containment() {
        let fence = OfficeGeofence {
            id: Uuid::new_v4(),
            name: None,
            latitude: 5.0,
            longitude: 5.0,
            radius_meters: 1.0,
            shape: GeofenceShape::Polygon,
            polygon: vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 10.0),
                GeoPoint::new(10.0, 10.0),
                GeoPoint::new(10.0, 0.0),
            ],
        };
        assert!(fence.contains(GeoPoint::new(5.0, 5.0)));
        assert!(!fence.contains(GeoPoint::new(11.0, 5.0)));
    }

    #[test]
    fn test_request_shape_validation() {
        let request = OfficeGeofenceRequest {
            name: None,
            latitude: 12.9716,
            longitude: 77.5946,
            radius_meters: 100.0,
            shape: GeofenceShape::Polygon,
            polygon: vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)],
        };
        assert!(request.validate_shape().is_err());

        let request = OfficeGeofenceRequest {
            shape: GeofenceShape::Circular,
            polygon: Vec::new(),
            ..request
        };
        assert!(request.validate_shape().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_bad_radius() {
        let json = r#"{
            "latitude": 12.9716,
            "longitude": 77.5946,
            "radiusMeters": -5.0
        }"#;
        let request: OfficeGeofenceRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_defaults_to_circular() {
        let json = r#"{
            "latitude": 12.9716,
            "longitude": 77.5946,
            "radiusMeters": 100.0
        }"#;
        let request: OfficeGeofenceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.shape, GeofenceShape::Circular);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_into_geofence_drops_polygon_for_circular() {
        let request = OfficeGeofenceRequest {
            name: Some("Depot".to_string()),
            latitude: 1.0,
            longitude: 2.0,
            radius_meters: 50.0,
            shape: GeofenceShape::Circular,
            polygon: vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 1.0),
                GeoPoint::new(1.0, 1.0),
            ],
        };
        let fence = request.into_geofence(Uuid::new_v4());
        assert!(fence.polygon.is_empty());
    }
}
