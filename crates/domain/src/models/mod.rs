//! Domain models for the Fleet Tracker backend.

pub mod driver;
pub mod event_log;
pub mod location_log;
pub mod office_geofence;
pub mod pickup_point;
pub mod trip;
pub mod vehicle;

pub use driver::Driver;
pub use event_log::{EventLog, GeofenceEventKind, NewEvent};
pub use location_log::{BatchResult, LocationLog, LocationPing, NewLocationLog};
pub use office_geofence::{GeofenceShape, OfficeGeofence};
pub use pickup_point::{PickupPoint, PickupStatus};
pub use trip::{ManualCloseRequest, Trip, TripResponse, TripStatus};
pub use vehicle::{Vehicle, VehicleStatus};
