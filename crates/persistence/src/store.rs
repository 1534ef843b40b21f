//! PostgreSQL implementation of the domain `Store` port.
//!
//! `load_trip_for_update` maps onto `SELECT … FOR UPDATE`, so the database
//! row lock is the per-trip serialization point. All staged writes share one
//! `sqlx` transaction and commit atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use domain::models::{
    Driver, EventLog, GeofenceEventKind, LocationLog, NewEvent, NewLocationLog, OfficeGeofence,
    PickupPoint, PickupStatus, Trip, Vehicle,
};
use domain::ports::store::{Store, StoreTx};
use domain::{Error, Result};

use crate::entities::{
    DriverEntity, EventLogEntity, LocationLogEntity, OfficeGeofenceEntity, PickupPointEntity,
    TripEntity, VehicleEntity,
};
use crate::metrics::QueryTimer;

const TRIP_COLUMNS: &str =
    "id, vehicle_id, status, start_time, end_time, total_distance_km, duration_minutes, office_entry_time";
const EVENT_COLUMNS: &str =
    "id, vehicle_id, trip_id, event_type, latitude, longitude, event_timestamp, created_at";
const LOCATION_COLUMNS: &str =
    "id, vehicle_id, trip_id, latitude, longitude, speed_kmh, recorded_at";
const GEOFENCE_COLUMNS: &str = "id, name, latitude, longitude, radius_meters, shape, polygon";
const PICKUP_COLUMNS: &str = "id, trip_id, latitude, longitude, radius_meters, status";

fn map_storage(err: sqlx::Error) -> Error {
    Error::Storage(err.to_string())
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(map_storage)?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn latest_location(&self, trip_id: Uuid) -> Result<Option<LocationLog>> {
        let timer = QueryTimer::new("latest_location");
        let entity = sqlx::query_as::<_, LocationLogEntity>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM location_logs \
             WHERE trip_id = $1 ORDER BY recorded_at DESC LIMIT 1"
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(entity.map(LocationLog::from))
    }

    async fn locations_for_trip(&self, trip_id: Uuid) -> Result<Vec<LocationLog>> {
        let timer = QueryTimer::new("locations_for_trip");
        let entities = sqlx::query_as::<_, LocationLogEntity>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM location_logs \
             WHERE trip_id = $1 ORDER BY recorded_at ASC"
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(entities.into_iter().map(LocationLog::from).collect())
    }

    async fn find_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
        let timer = QueryTimer::new("find_trip");
        let entity = sqlx::query_as::<_, TripEntity>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1"
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entity.map(TripEntity::into_domain).transpose()
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        let timer = QueryTimer::new("list_trips");
        let entities = sqlx::query_as::<_, TripEntity>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities.into_iter().map(TripEntity::into_domain).collect()
    }

    async fn pickups_for_trip(&self, trip_id: Uuid) -> Result<Vec<PickupPoint>> {
        let timer = QueryTimer::new("pickups_for_trip");
        let entities = sqlx::query_as::<_, PickupPointEntity>(&format!(
            "SELECT {PICKUP_COLUMNS} FROM pickup_points WHERE trip_id = $1 ORDER BY id"
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(PickupPointEntity::into_domain)
            .collect()
    }

    async fn list_geofences(&self) -> Result<Vec<OfficeGeofence>> {
        let timer = QueryTimer::new("list_geofences");
        let entities = sqlx::query_as::<_, OfficeGeofenceEntity>(&format!(
            "SELECT {GEOFENCE_COLUMNS} FROM office_geofences ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(OfficeGeofenceEntity::into_domain)
            .collect()
    }

    async fn find_geofence(&self, geofence_id: Uuid) -> Result<Option<OfficeGeofence>> {
        let timer = QueryTimer::new("find_geofence");
        let entity = sqlx::query_as::<_, OfficeGeofenceEntity>(&format!(
            "SELECT {GEOFENCE_COLUMNS} FROM office_geofences WHERE id = $1"
        ))
        .bind(geofence_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entity.map(OfficeGeofenceEntity::into_domain).transpose()
    }

    async fn insert_geofence(&self, geofence: OfficeGeofence) -> Result<OfficeGeofence> {
        let timer = QueryTimer::new("insert_geofence");
        sqlx::query(
            "INSERT INTO office_geofences (id, name, latitude, longitude, radius_meters, shape, polygon) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(geofence.id)
        .bind(&geofence.name)
        .bind(geofence.latitude)
        .bind(geofence.longitude)
        .bind(geofence.radius_meters)
        .bind(geofence.shape.as_str())
        .bind(OfficeGeofenceEntity::polygon_json(&geofence))
        .execute(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(geofence)
    }

    async fn update_geofence(&self, geofence: OfficeGeofence) -> Result<Option<OfficeGeofence>> {
        let timer = QueryTimer::new("update_geofence");
        let result = sqlx::query(
            "UPDATE office_geofences \
             SET name = $2, latitude = $3, longitude = $4, radius_meters = $5, shape = $6, polygon = $7 \
             WHERE id = $1",
        )
        .bind(geofence.id)
        .bind(&geofence.name)
        .bind(geofence.latitude)
        .bind(geofence.longitude)
        .bind(geofence.radius_meters)
        .bind(geofence.shape.as_str())
        .bind(OfficeGeofenceEntity::polygon_json(&geofence))
        .execute(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(geofence))
        }
    }

    async fn delete_geofence(&self, geofence_id: Uuid) -> Result<bool> {
        let timer = QueryTimer::new("delete_geofence");
        let result = sqlx::query("DELETE FROM office_geofences WHERE id = $1")
            .bind(geofence_id)
            .execute(&self.pool)
            .await
            .map_err(map_storage)?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        let timer = QueryTimer::new("list_vehicles");
        let entities = sqlx::query_as::<_, VehicleEntity>(
            "SELECT id, registration, status FROM vehicles ORDER BY registration",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(VehicleEntity::into_domain)
            .collect()
    }

    async fn driver_for_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Driver>> {
        let timer = QueryTimer::new("driver_for_vehicle");
        let entity = sqlx::query_as::<_, DriverEntity>(
            "SELECT id, name, phone, licence_number, vehicle_id FROM drivers \
             WHERE vehicle_id = $1 LIMIT 1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(entity.map(Driver::from))
    }

    async fn events_for_trip(&self, trip_id: Uuid) -> Result<Vec<EventLog>> {
        let timer = QueryTimer::new("events_for_trip");
        let entities = sqlx::query_as::<_, EventLogEntity>(&format!(
            "SELECT {EVENT_COLUMNS} FROM event_logs \
             WHERE trip_id = $1 ORDER BY event_timestamp ASC, created_at ASC"
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(EventLogEntity::into_domain)
            .collect()
    }

    async fn events_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<EventLog>> {
        let timer = QueryTimer::new("events_for_vehicle");
        let entities = sqlx::query_as::<_, EventLogEntity>(&format!(
            "SELECT {EVENT_COLUMNS} FROM event_logs \
             WHERE vehicle_id = $1 ORDER BY event_timestamp DESC, created_at DESC"
        ))
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(EventLogEntity::into_domain)
            .collect()
    }

    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventLog>> {
        let timer = QueryTimer::new("events_in_range");
        let entities = sqlx::query_as::<_, EventLogEntity>(&format!(
            "SELECT {EVENT_COLUMNS} FROM event_logs \
             WHERE event_timestamp >= $1 AND event_timestamp <= $2 \
             ORDER BY event_timestamp ASC, created_at ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(EventLogEntity::into_domain)
            .collect()
    }
}

struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn load_trip_for_update(&mut self, trip_id: Uuid) -> Result<Trip> {
        let timer = QueryTimer::new("load_trip_for_update");
        let entity = sqlx::query_as::<_, TripEntity>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 FOR UPDATE"
        ))
        .bind(trip_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        entity
            .ok_or_else(|| Error::trip_not_found(trip_id))?
            .into_domain()
    }

    async fn append_location(&mut self, log: NewLocationLog) -> Result<()> {
        let timer = QueryTimer::new("append_location");
        sqlx::query(
            "INSERT INTO location_logs (vehicle_id, trip_id, latitude, longitude, speed_kmh, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(log.vehicle_id)
        .bind(log.trip_id)
        .bind(log.latitude)
        .bind(log.longitude)
        .bind(log.speed_kmh)
        .bind(log.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn save_event(&mut self, event: NewEvent) -> Result<()> {
        let timer = QueryTimer::new("save_event");
        sqlx::query(
            "INSERT INTO event_logs (vehicle_id, trip_id, event_type, latitude, longitude, event_timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.vehicle_id)
        .bind(event.trip_id)
        .bind(event.event_type.as_str())
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.event_timestamp)
        .execute(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn exists_event(&mut self, trip_id: Uuid, kind: GeofenceEventKind) -> Result<bool> {
        let timer = QueryTimer::new("exists_event");
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM event_logs WHERE trip_id = $1 AND event_type = $2)",
        )
        .bind(trip_id)
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(exists)
    }

    async fn update_trip(&mut self, trip: &Trip) -> Result<()> {
        let timer = QueryTimer::new("update_trip");
        sqlx::query(
            "UPDATE trips \
             SET status = $2, start_time = $3, end_time = $4, total_distance_km = $5, \
                 duration_minutes = $6, office_entry_time = $7 \
             WHERE id = $1",
        )
        .bind(trip.id)
        .bind(trip.status.as_str())
        .bind(trip.start_time)
        .bind(trip.end_time)
        .bind(trip.total_distance_km)
        .bind(trip.duration_minutes)
        .bind(trip.office_entry_time)
        .execute(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn set_pickup_status(&mut self, pickup_id: Uuid, status: PickupStatus) -> Result<()> {
        let timer = QueryTimer::new("set_pickup_status");
        sqlx::query("UPDATE pickup_points SET status = $2 WHERE id = $1")
            .bind(pickup_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn pickups_for_trip(&mut self, trip_id: Uuid) -> Result<Vec<PickupPoint>> {
        let timer = QueryTimer::new("pickups_for_trip_tx");
        let entities = sqlx::query_as::<_, PickupPointEntity>(&format!(
            "SELECT {PICKUP_COLUMNS} FROM pickup_points WHERE trip_id = $1 ORDER BY id"
        ))
        .bind(trip_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_storage)?;
        timer.record();
        entities
            .into_iter()
            .map(PickupPointEntity::into_domain)
            .collect()
    }

    async fn delete_trip_history(&mut self, trip_id: Uuid) -> Result<()> {
        let timer = QueryTimer::new("delete_trip_history");
        sqlx::query("DELETE FROM location_logs WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_storage)?;
        sqlx::query("DELETE FROM event_logs WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn reset_pickups(&mut self, trip_id: Uuid) -> Result<()> {
        let timer = QueryTimer::new("reset_pickups");
        sqlx::query("UPDATE pickup_points SET status = 'PENDING' WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_storage)?;
        timer.record();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_storage)
    }
}
