//! Office geofence entity (database row mapping).

use sqlx::FromRow;
use uuid::Uuid;

use domain::geo::GeoPoint;
use domain::models::{GeofenceShape, OfficeGeofence};
use domain::Error;

/// Database row mapping for the office_geofences table. Polygon vertices
/// are stored as a JSONB array of `{latitude, longitude}` objects.
#[derive(Debug, Clone, FromRow)]
pub struct OfficeGeofenceEntity {
    pub id: Uuid,
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub shape: String,
    pub polygon: serde_json::Value,
}

impl OfficeGeofenceEntity {
    pub fn into_domain(self) -> domain::Result<OfficeGeofence> {
        let shape: GeofenceShape = self
            .shape
            .parse()
            .map_err(|e: String| Error::Storage(e))?;
        let polygon: Vec<GeoPoint> = serde_json::from_value(self.polygon)
            .map_err(|e| Error::Storage(format!("Malformed polygon column: {e}")))?;
        Ok(OfficeGeofence {
            id: self.id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius_meters,
            shape,
            polygon,
        })
    }

    /// Serializes the polygon column for insert/update binds.
    pub fn polygon_json(geofence: &OfficeGeofence) -> serde_json::Value {
        serde_json::to_value(&geofence.polygon).unwrap_or_else(|_| serde_json::json!([]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_domain_polygon() {
        let entity = OfficeGeofenceEntity {
            id: Uuid::new_v4(),
            name: Some("Campus".to_string()),
            latitude: 12.9716,
            longitude: 77.5946,
            radius_meters: 100.0,
            shape: "POLYGON".to_string(),
            polygon: serde_json::json!([
                {"latitude": 12.9700, "longitude": 77.5930},
                {"latitude": 12.9700, "longitude": 77.5960},
                {"latitude": 12.9730, "longitude": 77.5960},
            ]),
        };
        let fence = entity.into_domain().unwrap();
        assert_eq!(fence.shape, GeofenceShape::Polygon);
        assert_eq!(fence.polygon.len(), 3);
    }

    #[test]
    fn test_into_domain_rejects_malformed_polygon() {
        let entity = OfficeGeofenceEntity {
            id: Uuid::new_v4(),
            name: None,
            latitude: 12.9716,
            longitude: 77.5946,
            radius_meters: 100.0,
            shape: "CIRCULAR".to_string(),
            polygon: serde_json::json!("not-a-polygon"),
        };
        assert!(matches!(
            entity.into_domain(),
            Err(Error::Storage(_))
        ));
    }

    #[test]
    fn test_polygon_json_round_trip() {
        let fence = OfficeGeofence {
            id: Uuid::new_v4(),
            name: None,
            latitude: 0.0,
            longitude: 0.0,
            radius_meters: 10.0,
            shape: GeofenceShape::Polygon,
            polygon: vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(0.0, 1.0),
                GeoPoint::new(1.0, 1.0),
            ],
        };
        let json = OfficeGeofenceEntity::polygon_json(&fence);
        let parsed: Vec<GeoPoint> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.len(), 3);
    }
}
