//! Live-update fan-out.
//!
//! Two broadcast topics: every accepted ping after persistence, and typed
//! geofence transitions plus trip lifecycle notices. Delivery is best-effort:
//! a lagging subscriber drops messages instead of blocking publishers, and
//! nothing is retained for late subscribers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{GeofenceEventKind, TripStatus};

/// Lifecycle notices published on the geofence topic alongside audit kinds.
pub const TRIP_STARTED: &str = "TRIP_STARTED";
pub const TRIP_RESET: &str = "TRIP_RESET";

/// Message on the `location-updates` topic: an accepted ping with the final
/// trip snapshot after commit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub vehicle_registration: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    /// Device timestamp of the ping.
    pub timestamp: NaiveDateTime,
    pub trip_status: TripStatus,
    pub total_distance_km: f64,
}

/// Message on the `geofence-events` topic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceNotice {
    pub event_type: String,
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
    pub vehicle_registration: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Server clock at publish.
    pub timestamp: DateTime<Utc>,
}

impl GeofenceNotice {
    /// A typed geofence transition mirrored from the audit log.
    pub fn event(
        kind: GeofenceEventKind,
        vehicle_id: Uuid,
        trip_id: Uuid,
        vehicle_registration: String,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            vehicle_id,
            trip_id,
            vehicle_registration,
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Lifecycle notice: a trip left PENDING.
    pub fn trip_started(
        vehicle_id: Uuid,
        trip_id: Uuid,
        vehicle_registration: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: TRIP_STARTED.to_string(),
            vehicle_id,
            trip_id,
            vehicle_registration,
            latitude: 0.0,
            longitude: 0.0,
            timestamp,
        }
    }

    /// Lifecycle notice: a trip was reset by an admin.
    pub fn trip_reset(
        vehicle_id: Uuid,
        trip_id: Uuid,
        vehicle_registration: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type: TRIP_RESET.to_string(),
            vehicle_id,
            trip_id,
            vehicle_registration,
            latitude: 0.0,
            longitude: 0.0,
            timestamp,
        }
    }
}

/// In-process pub/sub over tokio broadcast channels.
#[derive(Debug)]
pub struct EventBus {
    location_tx: broadcast::Sender<LocationUpdate>,
    geofence_tx: broadcast::Sender<GeofenceNotice>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (location_tx, _) = broadcast::channel(capacity);
        let (geofence_tx, _) = broadcast::channel(capacity);
        Self {
            location_tx,
            geofence_tx,
        }
    }

    /// Broadcasts a location update to all current subscribers. A send with
    /// no subscribers is not an error.
    pub fn publish_location(&self, update: LocationUpdate) {
        let _ = self.location_tx.send(update);
    }

    pub fn publish_geofence(&self, notice: GeofenceNotice) {
        tracing::debug!(event_type = %notice.event_type, trip_id = %notice.trip_id, "Publishing geofence notice");
        let _ = self.geofence_tx.send(notice);
    }

    pub fn subscribe_locations(&self) -> broadcast::Receiver<LocationUpdate> {
        self.location_tx.subscribe()
    }

    pub fn subscribe_geofence(&self) -> broadcast::Receiver<GeofenceNotice> {
        self.geofence_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
