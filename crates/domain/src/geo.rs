//! Pure geometry primitives for geofence evaluation.
//!
//! All functions operate on raw WGS-84 coordinates. Containment tests treat
//! the (lat, lon) plane as Euclidean, which is accurate enough at the
//! sub-kilometre scale geofences are defined at.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres used by the Haversine formula.
pub const EARTH_RADIUS_METRES: f64 = 6_371_000.0;

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two points in metres (Haversine).
pub fn distance_metres(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METRES * h.sqrt().asin()
}

/// Whether `point` lies inside (or exactly on) a circle of `radius_metres`
/// around `centre`.
pub fn inside_circle(point: GeoPoint, centre: GeoPoint, radius_metres: f64) -> bool {
    distance_metres(point, centre) <= radius_metres
}

/// Even-odd ray-casting containment test on the (lat, lon) plane.
///
/// Returns `false` for degenerate input: fewer than 3 vertices, or any
/// non-finite coordinate.
pub fn inside_polygon(point: GeoPoint, vertices: &[GeoPoint]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    if !point.latitude.is_finite() || !point.longitude.is_finite() {
        return false;
    }
    if vertices
        .iter()
        .any(|v| !v.latitude.is_finite() || !v.longitude.is_finite())
    {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].longitude, vertices[i].latitude);
        let (xj, yj) = (vertices[j].longitude, vertices[j].latitude);

        let crosses = ((yi > point.latitude) != (yj > point.latitude))
            && point.longitude < (xj - xi) * (point.latitude - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}
