//! Read-only projections of the audit event log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::EventLog;
use crate::ports::store::Store;
use crate::{Error, Result};

pub struct AuditQuery {
    store: Arc<dyn Store>,
}

impl AuditQuery {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Events for one trip, oldest first.
    pub async fn by_trip(&self, trip_id: Uuid) -> Result<Vec<EventLog>> {
        self.store.events_for_trip(trip_id).await
    }

    /// Events for one vehicle, newest first.
    pub async fn by_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<EventLog>> {
        self.store.events_for_vehicle(vehicle_id).await
    }

    /// Events with an evaluation timestamp inside `[from, to]`, oldest first.
    pub async fn by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventLog>> {
        if from > to {
            return Err(Error::Validation(
                "Range start must not be after range end".to_string(),
            ));
        }
        self.store.events_in_range(from, to).await
    }
}
