//! Event log entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{EventLog, GeofenceEventKind};
use domain::Error;

/// Database row mapping for the event_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct EventLogEntity {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub event_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub event_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl EventLogEntity {
    pub fn into_domain(self) -> domain::Result<EventLog> {
        let event_type: GeofenceEventKind = self
            .event_type
            .parse()
            .map_err(|e: String| Error::Storage(e))?;
        Ok(EventLog {
            id: self.id,
            vehicle_id: self.vehicle_id,
            trip_id: self.trip_id,
            event_type,
            latitude: self.latitude,
            longitude: self.longitude,
            event_timestamp: self.event_timestamp,
            created_at: self.created_at,
        })
    }
}
