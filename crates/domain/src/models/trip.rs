//! Trip domain model and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// State of a trip in its lifecycle.
///
/// `PENDING → IN_PROGRESS → COMPLETED`; the only way back from COMPLETED is
/// an explicit admin reset, which bypasses `can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Pending,
    InProgress,
    Completed,
}

impl TripStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "PENDING",
            TripStatus::InProgress => "IN_PROGRESS",
            TripStatus::Completed => "COMPLETED",
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: TripStatus) -> bool {
        matches!(
            (self, target),
            (TripStatus::Pending, TripStatus::InProgress)
                | (TripStatus::InProgress, TripStatus::Completed)
        )
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TripStatus::Pending),
            "IN_PROGRESS" => Ok(TripStatus::InProgress),
            "COMPLETED" => Ok(TripStatus::Completed),
            _ => Err(format!(
                "Invalid trip status: {}. Must be one of: PENDING, IN_PROGRESS, COMPLETED",
                s
            )),
        }
    }
}

/// A trip: one vehicle, many pickup points, one terminal arrival.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub status: TripStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    /// Dwell anchor: when the vehicle most recently entered an office
    /// geofence. Only ever set while the trip is IN_PROGRESS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_entry_time: Option<DateTime<Utc>>,
}

impl Trip {
    /// PENDING → IN_PROGRESS. Stamps the start time and clears every
    /// derived field from a previous run.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.status = TripStatus::InProgress;
        self.start_time = Some(now);
        self.end_time = None;
        self.duration_minutes = None;
        self.office_entry_time = None;
    }

    /// IN_PROGRESS → COMPLETED. The dwell anchor is always cleared so the
    /// `status ≠ IN_PROGRESS ⇒ office_entry_time = null` invariant holds.
    pub fn complete(&mut self, end_time: DateTime<Utc>, duration_minutes: i64) {
        self.status = TripStatus::Completed;
        self.end_time = Some(end_time);
        self.duration_minutes = Some(duration_minutes);
        self.office_entry_time = None;
    }

    /// Admin reset: back to PENDING with all derived state cleared.
    pub fn reset(&mut self) {
        self.status = TripStatus::Pending;
        self.start_time = None;
        self.end_time = None;
        self.total_distance_km = 0.0;
        self.duration_minutes = None;
        self.office_entry_time = None;
    }
}

/// Request payload for manually closing a trip.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualCloseRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(length(max = 250, message = "Reason must be at most 250 characters"))]
    pub reason: Option<String>,
}

/// Response payload for trip reads and mutations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub status: TripStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            vehicle_id: trip.vehicle_id,
            status: trip.status,
            start_time: trip.start_time,
            end_time: trip.end_time,
            total_distance_km: trip.total_distance_km,
            duration_minutes: trip.duration_minutes,
        }
    }
}
