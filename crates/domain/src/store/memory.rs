//! In-memory store for development and testing.
//!
//! Implements the full [`Store`] contract over process-local collections.
//! The per-trip row lock of the SQL implementation is modelled with one
//! `tokio::sync::Mutex` per trip id, held by the transaction until commit;
//! writes are staged on the transaction and applied atomically, so a dropped
//! transaction rolls back exactly like an aborted database transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    Driver, EventLog, GeofenceEventKind, LocationLog, NewEvent, NewLocationLog, OfficeGeofence,
    PickupPoint, PickupStatus, Trip, TripStatus, Vehicle, VehicleStatus,
};
use crate::ports::store::{Store, StoreTx};
use crate::{Error, Result};

#[derive(Default)]
struct Inner {
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: Vec<Driver>,
    trips: HashMap<Uuid, Trip>,
    pickups: HashMap<Uuid, PickupPoint>,
    geofences: Vec<OfficeGeofence>,
    locations: Vec<LocationLog>,
    events: Vec<EventLog>,
}

/// Process-local [`Store`] implementation.
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    trip_locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
    fail_event_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            trip_locks: Arc::new(Mutex::new(HashMap::new())),
            fail_event_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `save_event` fail with a storage error, to
    /// exercise the best-effort audit policy.
    pub fn fail_event_writes(&self, fail: bool) {
        self.fail_event_writes.store(fail, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Fixture helpers
    // ------------------------------------------------------------------

    pub fn add_vehicle(&self, registration: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().vehicles.insert(
            id,
            Vehicle {
                id,
                registration: registration.to_string(),
                status: VehicleStatus::Active,
            },
        );
        id
    }

    pub fn add_driver(&self, name: &str, phone: &str, licence: &str, vehicle_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().drivers.push(Driver {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            licence_number: licence.to_string(),
            vehicle_id,
        });
        id
    }

    /// Seeds a trip in the given status. An IN_PROGRESS trip gets a start
    /// time of now; use [`MemoryStore::put_trip`] for full control.
    pub fn add_trip(&self, vehicle_id: Uuid, status: TripStatus) -> Uuid {
        let id = Uuid::new_v4();
        let start_time = match status {
            TripStatus::Pending => None,
            _ => Some(Utc::now()),
        };
        self.put_trip(Trip {
            id,
            vehicle_id,
            status,
            start_time,
            end_time: None,
            total_distance_km: 0.0,
            duration_minutes: None,
            office_entry_time: None,
        });
        id
    }

    /// Inserts or replaces a trip exactly as given.
    pub fn put_trip(&self, trip: Trip) {
        self.lock().trips.insert(trip.id, trip);
    }

    pub fn add_pickup(&self, trip_id: Uuid, latitude: f64, longitude: f64, radius_meters: f64) -> Uuid {
        self.add_pickup_with_status(trip_id, latitude, longitude, radius_meters, PickupStatus::Pending)
    }

    pub fn add_pickup_with_status(
        &self,
        trip_id: Uuid,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        status: PickupStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().pickups.insert(
            id,
            PickupPoint {
                id,
                trip_id,
                latitude,
                longitude,
                radius_meters,
                status,
            },
        );
        id
    }

    pub fn add_geofence(&self, geofence: OfficeGeofence) {
        self.lock().geofences.push(geofence);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        Ok(Box::new(MemoryTx {
            inner: self.inner.clone(),
            trip_locks: self.trip_locks.clone(),
            _row_locks: Vec::new(),
            staged: Vec::new(),
            fail_event_writes: self.fail_event_writes.load(Ordering::SeqCst),
        }))
    }

    async fn latest_location(&self, trip_id: Uuid) -> Result<Option<LocationLog>> {
        let inner = self.lock();
        Ok(inner
            .locations
            .iter()
            .filter(|l| l.trip_id == trip_id)
            .max_by_key(|l| l.recorded_at)
            .cloned())
    }

    async fn locations_for_trip(&self, trip_id: Uuid) -> Result<Vec<LocationLog>> {
        let inner = self.lock();
        let mut trail: Vec<LocationLog> = inner
            .locations
            .iter()
            .filter(|l| l.trip_id == trip_id)
            .cloned()
            .collect();
        trail.sort_by_key(|l| l.recorded_at);
        Ok(trail)
    }

    async fn find_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
        Ok(self.lock().trips.get(&trip_id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        let inner = self.lock();
        let mut trips: Vec<Trip> = inner.trips.values().cloned().collect();
        trips.sort_by_key(|t| t.id);
        Ok(trips)
    }

    async fn pickups_for_trip(&self, trip_id: Uuid) -> Result<Vec<PickupPoint>> {
        let inner = self.lock();
        let mut pickups: Vec<PickupPoint> = inner
            .pickups
            .values()
            .filter(|p| p.trip_id == trip_id)
            .cloned()
            .collect();
        pickups.sort_by_key(|p| p.id);
        Ok(pickups)
    }

    async fn list_geofences(&self) -> Result<Vec<OfficeGeofence>> {
        Ok(self.lock().geofences.clone())
    }

    async fn find_geofence(&self, geofence_id: Uuid) -> Result<Option<OfficeGeofence>> {
        Ok(self
            .lock()
            .geofences
            .iter()
            .find(|g| g.id == geofence_id)
            .cloned())
    }

    async fn insert_geofence(&self, geofence: OfficeGeofence) -> Result<OfficeGeofence> {
        self.lock().geofences.push(geofence.clone());
        Ok(geofence)
    }

    async fn update_geofence(&self, geofence: OfficeGeofence) -> Result<Option<OfficeGeofence>> {
        let mut inner = self.lock();
        match inner.geofences.iter_mut().find(|g| g.id == geofence.id) {
            Some(slot) => {
                *slot = geofence.clone();
                Ok(Some(geofence))
            }
            None => Ok(None),
        }
    }

    async fn delete_geofence(&self, geofence_id: Uuid) -> Result<bool> {
        let mut inner = self.lock();
        let before = inner.geofences.len();
        inner.geofences.retain(|g| g.id != geofence_id);
        Ok(inner.geofences.len() < before)
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let inner = self.lock();
        let mut vehicles: Vec<Vehicle> = inner.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.registration.cmp(&b.registration));
        Ok(vehicles)
    }

    async fn driver_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Driver>> {
        Ok(self
            .lock()
            .drivers
            .iter()
            .find(|d| d.vehicle_id == Some(vehicle_id))
            .cloned())
    }

    async fn events_for_trip(&self, trip_id: Uuid) -> Result<Vec<EventLog>> {
        let inner = self.lock();
        let mut events: Vec<EventLog> = inner
            .events
            .iter()
            .filter(|e| e.trip_id == Some(trip_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_timestamp);
        Ok(events)
    }

    async fn events_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<EventLog>> {
        let inner = self.lock();
        let mut events: Vec<EventLog> = inner
            .events
            .iter()
            .filter(|e| e.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.event_timestamp));
        Ok(events)
    }

    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventLog>> {
        let inner = self.lock();
        let mut events: Vec<EventLog> = inner
            .events
            .iter()
            .filter(|e| e.event_timestamp >= from && e.event_timestamp <= to)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_timestamp);
        Ok(events)
    }
}

enum Staged {
    Location(NewLocationLog),
    Event(NewEvent),
    Trip(Trip),
    PickupStatus(Uuid, PickupStatus),
    DeleteHistory(Uuid),
    ResetPickups(Uuid),
}

struct MemoryTx {
    inner: Arc<Mutex<Inner>>,
    trip_locks: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
    /// Held per-trip locks; released when the transaction drops.
    _row_locks: Vec<OwnedMutexGuard<()>>,
    staged: Vec<Staged>,
    fail_event_writes: bool,
}

impl MemoryTx {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn load_trip_for_update(&mut self, trip_id: Uuid) -> Result<Trip> {
        let lock = {
            let mut locks = self.trip_locks.lock().expect("trip lock table poisoned");
            locks
                .entry(trip_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;
        self._row_locks.push(guard);

        self.lock()
            .trips
            .get(&trip_id)
            .cloned()
            .ok_or_else(|| Error::trip_not_found(trip_id))
    }

    async fn append_location(&mut self, log: NewLocationLog) -> Result<()> {
        self.staged.push(Staged::Location(log));
        Ok(())
    }

    async fn save_event(&mut self, event: NewEvent) -> Result<()> {
        if self.fail_event_writes {
            return Err(Error::Storage("event log write rejected".to_string()));
        }
        self.staged.push(Staged::Event(event));
        Ok(())
    }

    async fn exists_event(&mut self, trip_id: Uuid, kind: GeofenceEventKind) -> Result<bool> {
        Ok(self
            .lock()
            .events
            .iter()
            .any(|e| e.trip_id == Some(trip_id) && e.event_type == kind))
    }

    async fn update_trip(&mut self, trip: &Trip) -> Result<()> {
        self.staged.push(Staged::Trip(trip.clone()));
        Ok(())
    }

    async fn set_pickup_status(&mut self, pickup_id: Uuid, status: PickupStatus) -> Result<()> {
        self.staged.push(Staged::PickupStatus(pickup_id, status));
        Ok(())
    }

    async fn pickups_for_trip(&mut self, trip_id: Uuid) -> Result<Vec<PickupPoint>> {
        let inner = self.lock();
        let mut pickups: Vec<PickupPoint> = inner
            .pickups
            .values()
            .filter(|p| p.trip_id == trip_id)
            .cloned()
            .collect();
        pickups.sort_by_key(|p| p.id);
        Ok(pickups)
    }

    async fn delete_trip_history(&mut self, trip_id: Uuid) -> Result<()> {
        self.staged.push(Staged::DeleteHistory(trip_id));
        Ok(())
    }

    async fn reset_pickups(&mut self, trip_id: Uuid) -> Result<()> {
        self.staged.push(Staged::ResetPickups(trip_id));
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let mut inner = self.inner.lock().expect("memory store lock poisoned");
        for write in staged {
            match write {
                Staged::Location(log) => inner.locations.push(LocationLog {
                    id: Uuid::new_v4(),
                    vehicle_id: log.vehicle_id,
                    trip_id: log.trip_id,
                    latitude: log.latitude,
                    longitude: log.longitude,
                    speed_kmh: log.speed_kmh,
                    recorded_at: log.recorded_at,
                }),
                Staged::Event(event) => inner.events.push(EventLog {
                    id: Uuid::new_v4(),
                    vehicle_id: event.vehicle_id,
                    trip_id: event.trip_id,
                    event_type: event.event_type,
                    latitude: event.latitude,
                    longitude: event.longitude,
                    event_timestamp: event.event_timestamp,
                    created_at: Utc::now(),
                }),
                Staged::Trip(trip) => {
                    inner.trips.insert(trip.id, trip);
                }
                Staged::PickupStatus(pickup_id, status) => {
                    if let Some(pickup) = inner.pickups.get_mut(&pickup_id) {
                        pickup.status = status;
                    }
                }
                Staged::DeleteHistory(trip_id) => {
                    inner.locations.retain(|l| l.trip_id != trip_id);
                    inner.events.retain(|e| e.trip_id != Some(trip_id));
                }
                Staged::ResetPickups(trip_id) => {
                    for pickup in inner.pickups.values_mut().filter(|p| p.trip_id == trip_id) {
                        pickup.status = PickupStatus::Pending;
                    }
                }
            }
        }
        // Trip locks release when the guards drop with the transaction.
        Ok(())
    }
}
