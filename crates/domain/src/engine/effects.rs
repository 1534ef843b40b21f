//! Effects produced by the engine and applied by the coordinator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::GeofenceEventKind;

/// One step of the atomic apply list. Within a list, pickup effects come
/// first (in pickup id order), then office effects in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEffect {
    /// Flip a pickup to ARRIVED.
    MarkPickupArrived(Uuid),
    /// Append an audit row at the ping position.
    EmitEvent {
        kind: GeofenceEventKind,
        latitude: f64,
        longitude: f64,
    },
    /// Set or clear the office dwell anchor.
    SetOfficeEntry(Option<DateTime<Utc>>),
    /// Transition the trip to COMPLETED.
    CompleteTrip {
        end_time: DateTime<Utc>,
        duration_minutes: i64,
    },
    /// Post-commit: notify the pickup-arrival channel.
    NotifyPickup { latitude: f64, longitude: f64 },
    /// Post-commit: notify the trip-completion channel.
    NotifyCompletion,
    /// Post-commit: alert an admin about an out-of-geofence manual closure.
    NotifyAdminAlert,
    /// Post-commit: publish a typed transition on the geofence topic.
    PublishGeofence(GeofenceEventKind),
}
