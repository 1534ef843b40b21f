//! Database row mappings.

pub mod event_log;
pub mod location_log;
pub mod office_geofence;
pub mod pickup_point;
pub mod trip;
pub mod vehicle;

pub use event_log::EventLogEntity;
pub use location_log::LocationLogEntity;
pub use office_geofence::OfficeGeofenceEntity;
pub use pickup_point::PickupPointEntity;
pub use trip::TripEntity;
pub use vehicle::{DriverEntity, VehicleEntity};
