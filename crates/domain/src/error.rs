//! Domain error types.
//!
//! The closed set of error kinds produced by the tracking pipeline. The api
//! crate maps each variant onto an HTTP status; nothing below this layer
//! panics on bad input.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by domain services and store implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// Request-level validation failure (bad coordinates, malformed polygon,
    /// inverted time range, empty batch).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Manual closure attempted on a trip that is already COMPLETED.
    #[error("Trip {0} is already in a terminal state")]
    AlreadyTerminal(Uuid),

    /// A batch exceeded the configured maximum size.
    #[error("Batch of {size} pings exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Storage failure that escaped the transaction manager's retries.
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a [`Error::NotFound`] on a trip id.
    pub fn trip_not_found(trip_id: Uuid) -> Self {
        Error::NotFound(format!("Trip {trip_id}"))
    }

    /// Shorthand for a [`Error::NotFound`] on a geofence id.
    pub fn geofence_not_found(geofence_id: Uuid) -> Self {
        Error::NotFound(format!("Geofence {geofence_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            Error::trip_not_found(id).to_string(),
            format!("Trip {id} not found")
        );
        assert_eq!(
            Error::AlreadyTerminal(id).to_string(),
            format!("Trip {id} is already in a terminal state")
        );
        assert_eq!(
            Error::BatchTooLarge { size: 150, max: 100 }.to_string(),
            "Batch of 150 pings exceeds the maximum of 100"
        );
    }
}
