//! Read-through static-data cache.
//!
//! Geofences, the vehicle list and per-vehicle drivers change rarely; the
//! engine reads them on every ping. Two logical caches front the store: one
//! for geofences, one for vehicle/driver data. Each entry carries a write-TTL
//! and the caches are LRU-bounded. Admin writes and resets evict explicitly.
//! Concurrent misses may both hit the store; the last write wins, which is
//! harmless for read-mostly data.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::{Driver, OfficeGeofence, Vehicle};
use crate::ports::store::Store;
use crate::Result;

/// Sizing and expiry policy for the static-data caches.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub geofence_capacity: usize,
    pub vehicle_capacity: usize,
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            geofence_capacity: 20,
            vehicle_capacity: 50,
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

struct CacheEntry<V> {
    value: V,
    written_at: Instant,
}

/// A bounded map with write-TTL expiry and least-recently-used eviction.
pub struct TtlLruCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
    /// Recency order, least recently used at the front.
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlLruCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns a clone of the live value, bumping its recency. Entries past
    /// their write-TTL are dropped on access.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.written_at.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.touch(key);
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Inserts or replaces, resetting the write-TTL. Evicts the least
    /// recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.touch(&key);
        } else {
            if self.entries.len() >= self.capacity {
                if let Some(lru) = self.order.pop_front() {
                    self.entries.remove(&lru);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: Instant::now(),
            },
        );
    }

    pub fn remove(&mut self, key: &K) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GeofenceKey {
    All,
    ById(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VehicleDriverKey {
    VehicleList,
    DriverFor(Uuid),
}

#[derive(Clone)]
enum VehicleDriverEntry {
    Vehicles(Vec<Vehicle>),
    Driver(Option<Driver>),
}

/// Cached read-through access to geofences, vehicles and drivers.
pub struct StaticDataProvider {
    store: Arc<dyn Store>,
    geofences: Mutex<TtlLruCache<GeofenceKey, Vec<OfficeGeofence>>>,
    vehicle_driver: Mutex<TtlLruCache<VehicleDriverKey, VehicleDriverEntry>>,
}

impl StaticDataProvider {
    pub fn new(store: Arc<dyn Store>, policy: CachePolicy) -> Self {
        Self {
            store,
            geofences: Mutex::new(TtlLruCache::new(policy.geofence_capacity, policy.ttl)),
            vehicle_driver: Mutex::new(TtlLruCache::new(policy.vehicle_capacity, policy.ttl)),
        }
    }

    /// All office geofences, cached under a single key.
    pub async fn geofences(&self) -> Result<Vec<OfficeGeofence>> {
        if let Some(cached) = self.lock_geofences().get(&GeofenceKey::All) {
            return Ok(cached);
        }
        let loaded = self.store.list_geofences().await?;
        self.lock_geofences().insert(GeofenceKey::All, loaded.clone());
        Ok(loaded)
    }

    /// A single geofence by id, cached per id.
    pub async fn geofence(&self, geofence_id: Uuid) -> Result<Option<OfficeGeofence>> {
        let key = GeofenceKey::ById(geofence_id);
        if let Some(cached) = self.lock_geofences().get(&key) {
            return Ok(cached.into_iter().next());
        }
        let loaded = self.store.find_geofence(geofence_id).await?;
        self.lock_geofences()
            .insert(key, loaded.clone().into_iter().collect());
        Ok(loaded)
    }

    /// The full vehicle list, cached under a single key.
    pub async fn vehicles(&self) -> Result<Vec<Vehicle>> {
        if let Some(VehicleDriverEntry::Vehicles(cached)) =
            self.lock_vehicle_driver().get(&VehicleDriverKey::VehicleList)
        {
            return Ok(cached);
        }
        let loaded = self.store.list_vehicles().await?;
        self.lock_vehicle_driver().insert(
            VehicleDriverKey::VehicleList,
            VehicleDriverEntry::Vehicles(loaded.clone()),
        );
        Ok(loaded)
    }

    /// Registration string for a vehicle id, from the cached vehicle list.
    pub async fn registration_for(&self, vehicle_id: Uuid) -> Result<Option<String>> {
        let vehicles = self.vehicles().await?;
        Ok(vehicles
            .into_iter()
            .find(|v| v.id == vehicle_id)
            .map(|v| v.registration))
    }

    /// The driver assigned to a vehicle, cached per vehicle id.
    pub async fn driver_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Driver>> {
        let key = VehicleDriverKey::DriverFor(vehicle_id);
        if let Some(VehicleDriverEntry::Driver(cached)) = self.lock_vehicle_driver().get(&key) {
            return Ok(cached);
        }
        let loaded = self.store.driver_for_vehicle(vehicle_id).await?;
        self.lock_vehicle_driver()
            .insert(key, VehicleDriverEntry::Driver(loaded.clone()));
        Ok(loaded)
    }

    /// Drops every cached geofence entry. Called from admin geofence writes.
    pub fn evict_geofences(&self) {
        self.lock_geofences().clear();
    }

    /// Drops everything. Called from the admin reset path.
    pub fn evict_all(&self) {
        self.lock_geofences().clear();
        self.lock_vehicle_driver().clear();
    }

    fn lock_geofences(
        &self,
    ) -> std::sync::MutexGuard<'_, TtlLruCache<GeofenceKey, Vec<OfficeGeofence>>> {
        self.geofences.lock().expect("geofence cache lock poisoned")
    }

    fn lock_vehicle_driver(
        &self,
    ) -> std::sync::MutexGuard<'_, TtlLruCache<VehicleDriverKey, VehicleDriverEntry>> {
        self.vehicle_driver
            .lock()
            .expect("vehicle/driver cache lock poisoned")
    }
}
