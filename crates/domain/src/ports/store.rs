//! Storage port.
//!
//! `Store` is the durable-persistence seam: the production implementation
//! lives in the persistence crate on PostgreSQL, the in-memory one in
//! [`crate::store::memory`] for tests and development. All trip mutation goes
//! through a [`StoreTx`], whose `load_trip_for_update` acquires the per-trip
//! exclusive lock that serializes concurrent pings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Driver, EventLog, GeofenceEventKind, LocationLog, NewEvent, NewLocationLog, OfficeGeofence,
    PickupPoint, PickupStatus, Trip, Vehicle,
};
use crate::Result;

/// Durable persistence for trips, pickups, geofences, location logs and the
/// audit event log.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction. Every write path runs inside one; commit is
    /// atomic for the location log, the trip mutation, audit events and
    /// pickup mutations staged on it.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    /// Most recent location log for a trip by device timestamp, if any.
    async fn latest_location(&self, trip_id: Uuid) -> Result<Option<LocationLog>>;

    /// Full ping trail for a trip, chronological.
    async fn locations_for_trip(&self, trip_id: Uuid) -> Result<Vec<LocationLog>>;

    async fn find_trip(&self, trip_id: Uuid) -> Result<Option<Trip>>;

    async fn list_trips(&self) -> Result<Vec<Trip>>;

    async fn pickups_for_trip(&self, trip_id: Uuid) -> Result<Vec<PickupPoint>>;

    async fn list_geofences(&self) -> Result<Vec<OfficeGeofence>>;

    async fn find_geofence(&self, geofence_id: Uuid) -> Result<Option<OfficeGeofence>>;

    async fn insert_geofence(&self, geofence: OfficeGeofence) -> Result<OfficeGeofence>;

    /// Replaces an existing geofence. Returns `None` when the id is unknown.
    async fn update_geofence(&self, geofence: OfficeGeofence) -> Result<Option<OfficeGeofence>>;

    /// Returns whether a row was deleted.
    async fn delete_geofence(&self, geofence_id: Uuid) -> Result<bool>;

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>>;

    async fn driver_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Driver>>;

    /// Audit projection: all events for a trip, oldest first.
    async fn events_for_trip(&self, trip_id: Uuid) -> Result<Vec<EventLog>>;

    /// Audit projection: all events for a vehicle, newest first.
    async fn events_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<EventLog>>;

    /// Audit projection: events with `event_timestamp` in `[from, to]`,
    /// oldest first.
    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventLog>>;
}

/// A storage transaction. Writes are visible to other connections only after
/// `commit`; dropping without commit rolls everything back.
#[async_trait]
pub trait StoreTx: Send {
    /// Loads a trip under a row-level exclusive lock held until commit. This
    /// is the serialization point for all per-trip mutation. Fails with
    /// `NotFound` when the trip does not exist.
    async fn load_trip_for_update(&mut self, trip_id: Uuid) -> Result<Trip>;

    /// Insert-only ping history append.
    async fn append_location(&mut self, log: NewLocationLog) -> Result<()>;

    /// Insert-only audit append; stamps `created_at` at insert.
    async fn save_event(&mut self, event: NewEvent) -> Result<()>;

    /// Whether any committed event of `kind` exists for the trip. Backed by
    /// the `(trip_id, event_type)` index.
    async fn exists_event(&mut self, trip_id: Uuid, kind: GeofenceEventKind) -> Result<bool>;

    /// Persists the staged trip mutation.
    async fn update_trip(&mut self, trip: &Trip) -> Result<()>;

    async fn set_pickup_status(&mut self, pickup_id: Uuid, status: PickupStatus) -> Result<()>;

    /// Pickups for a trip, read inside the transaction.
    async fn pickups_for_trip(&mut self, trip_id: Uuid) -> Result<Vec<PickupPoint>>;

    /// Admin reset: deletes the trip's location logs and audit events.
    async fn delete_trip_history(&mut self, trip_id: Uuid) -> Result<()>;

    /// Admin reset: returns every pickup of the trip to PENDING.
    async fn reset_pickups(&mut self, trip_id: Uuid) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
