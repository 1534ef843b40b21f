//! Append-only audit event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The closed set of audit event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceEventKind {
    PickupArrived,
    OfficeReached,
    TripCompleted,
    GeofenceExit,
    ManualClosure,
    ManualClosureOutsideGeofence,
    AdminAlert,
    TripClosureBlockedPendingPickups,
    TripClosureBlockedMinDuration,
}

impl GeofenceEventKind {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceEventKind::PickupArrived => "PICKUP_ARRIVED",
            GeofenceEventKind::OfficeReached => "OFFICE_REACHED",
            GeofenceEventKind::TripCompleted => "TRIP_COMPLETED",
            GeofenceEventKind::GeofenceExit => "GEOFENCE_EXIT",
            GeofenceEventKind::ManualClosure => "MANUAL_CLOSURE",
            GeofenceEventKind::ManualClosureOutsideGeofence => "MANUAL_CLOSURE_OUTSIDE_GEOFENCE",
            GeofenceEventKind::AdminAlert => "ADMIN_ALERT",
            GeofenceEventKind::TripClosureBlockedPendingPickups => {
                "TRIP_CLOSURE_BLOCKED_PENDING_PICKUPS"
            }
            GeofenceEventKind::TripClosureBlockedMinDuration => {
                "TRIP_CLOSURE_BLOCKED_MIN_DURATION"
            }
        }
    }
}

impl fmt::Display for GeofenceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GeofenceEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PICKUP_ARRIVED" => Ok(GeofenceEventKind::PickupArrived),
            "OFFICE_REACHED" => Ok(GeofenceEventKind::OfficeReached),
            "TRIP_COMPLETED" => Ok(GeofenceEventKind::TripCompleted),
            "GEOFENCE_EXIT" => Ok(GeofenceEventKind::GeofenceExit),
            "MANUAL_CLOSURE" => Ok(GeofenceEventKind::ManualClosure),
            "MANUAL_CLOSURE_OUTSIDE_GEOFENCE" => {
                Ok(GeofenceEventKind::ManualClosureOutsideGeofence)
            }
            "ADMIN_ALERT" => Ok(GeofenceEventKind::AdminAlert),
            "TRIP_CLOSURE_BLOCKED_PENDING_PICKUPS" => {
                Ok(GeofenceEventKind::TripClosureBlockedPendingPickups)
            }
            "TRIP_CLOSURE_BLOCKED_MIN_DURATION" => {
                Ok(GeofenceEventKind::TripClosureBlockedMinDuration)
            }
            _ => Err(format!("Invalid geofence event kind: {}", s)),
        }
    }
}

/// One immutable audit row. Both timestamps come from the server clock:
/// `event_timestamp` at evaluation, `created_at` at insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLog {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    pub event_type: GeofenceEventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub event_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input data for inserting an audit row. `created_at` is stamped by the
/// store at insert.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub vehicle_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub event_type: GeofenceEventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub event_timestamp: DateTime<Utc>,
}
