//! Common validation utilities.

use validator::ValidationError;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a speed reading is non-negative.
pub fn validate_speed(speed_kmh: f64) -> Result<(), ValidationError> {
    if speed_kmh >= 0.0 && speed_kmh.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("speed_range");
        err.message = Some("Speed must be a non-negative number".into());
        Err(err)
    }
}

/// Validates that a geofence radius is strictly positive.
pub fn validate_radius(radius_meters: f64) -> Result<(), ValidationError> {
    if radius_meters > 0.0 && radius_meters.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("radius_range");
        err.message = Some("Radius must be greater than 0".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(12.9716).is_ok());
        assert!(validate_latitude(90.0001).is_err());
        assert!(validate_latitude(-100.0).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(77.5946).is_ok());
        assert!(validate_longitude(180.0001).is_err());
        assert!(validate_longitude(-200.0).is_err());
    }

    #[test]
    fn test_validate_speed() {
        assert!(validate_speed(0.0).is_ok());
        assert!(validate_speed(42.5).is_ok());
        assert!(validate_speed(-0.1).is_err());
        assert!(validate_speed(f64::NAN).is_err());
        assert!(validate_speed(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(1.0).is_ok());
        assert!(validate_radius(50.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-10.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
    }
}
