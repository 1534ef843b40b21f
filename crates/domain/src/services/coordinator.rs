//! Trip coordinator: owns the per-ping transaction and the trip state
//! machine.
//!
//! One ping is processed as: read previous location, open a transaction,
//! lock the trip row, append the ping, accumulate distance, evaluate the
//! engine, apply its effects, commit. Notifier calls and bus publishes run
//! strictly after commit so a failed side effect can never roll back state.
//! Audit writes inside the transaction are best-effort: a rejected event row
//! is logged and the trip mutation still commits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::{self, EngineConfig, EngineEffect};
use crate::geo;
use crate::models::{
    GeofenceEventKind, LocationPing, ManualCloseRequest, NewEvent, NewLocationLog, PickupStatus,
    Trip, TripStatus,
};
use crate::ports::event_bus::{EventBus, GeofenceNotice, LocationUpdate};
use crate::ports::notifier::{Notifier, NotifyResult};
use crate::ports::static_data::StaticDataProvider;
use crate::ports::store::{Store, StoreTx};
use crate::{Error, Result};

/// Side effects deferred until after commit.
enum PostAction {
    NotifyPickup { latitude: f64, longitude: f64 },
    NotifyCompletion,
    NotifyAdminAlert,
    Publish { kind: GeofenceEventKind, latitude: f64, longitude: f64 },
}

pub struct TripCoordinator {
    store: Arc<dyn Store>,
    static_data: Arc<StaticDataProvider>,
    notifier: Arc<dyn Notifier>,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl TripCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        static_data: Arc<StaticDataProvider>,
        notifier: Arc<dyn Notifier>,
        bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            static_data,
            notifier,
            bus,
            config,
        }
    }

    /// Processes one accepted ping end to end. Returns the trip snapshot as
    /// committed.
    pub async fn process_ping(&self, ping: &LocationPing) -> Result<Trip> {
        let prev = self.store.latest_location(ping.trip_id).await?;
        let geofences = self.static_data.geofences().await?;

        let mut tx = self.store.begin().await?;
        let mut trip = tx.load_trip_for_update(ping.trip_id).await?;

        tx.append_location(NewLocationLog::from(ping)).await?;

        if let Some(prev) = prev {
            // Monotonic accumulator; Haversine distance is never negative.
            trip.total_distance_km += geo::distance_metres(prev.point(), ping.point()) / 1000.0;
        }

        let pickups = tx.pickups_for_trip(trip.id).await?;
        let now = Utc::now();
        let office_recorded = tx
            .exists_event(trip.id, GeofenceEventKind::OfficeReached)
            .await?;

        let effects = engine::evaluate(
            &trip,
            ping,
            &pickups,
            &geofences,
            office_recorded,
            now,
            &self.config,
        );

        let post = self
            .apply_effects(&mut tx, &mut trip, &effects, ping.latitude, ping.longitude, now)
            .await?;

        tx.update_trip(&trip).await?;
        tx.commit().await?;

        tracing::debug!(
            trip_id = %trip.id,
            vehicle_id = %trip.vehicle_id,
            effects = effects.len(),
            status = %trip.status,
            "Ping processed"
        );

        let registration = self.registration_for(trip.vehicle_id).await;
        self.bus.publish_location(LocationUpdate {
            vehicle_id: trip.vehicle_id,
            trip_id: trip.id,
            vehicle_registration: registration.clone(),
            latitude: ping.latitude,
            longitude: ping.longitude,
            speed_kmh: ping.speed_kmh,
            timestamp: ping.timestamp,
            trip_status: trip.status,
            total_distance_km: trip.total_distance_km,
        });
        self.run_post_actions(post, &trip, &registration, None, now)
            .await;

        Ok(trip)
    }

    /// Manually closes an IN_PROGRESS trip at the given position.
    pub async fn manual_close(
        &self,
        trip_id: Uuid,
        request: &ManualCloseRequest,
    ) -> Result<Trip> {
        let geofences = self.static_data.geofences().await?;

        let mut tx = self.store.begin().await?;
        let mut trip = tx.load_trip_for_update(trip_id).await?;
        let now = Utc::now();

        let effects = engine::plan_manual_close(
            &trip,
            request.latitude,
            request.longitude,
            &geofences,
            now,
        )?;
        let post = self
            .apply_effects(
                &mut tx,
                &mut trip,
                &effects,
                request.latitude,
                request.longitude,
                now,
            )
            .await?;

        tx.update_trip(&trip).await?;
        tx.commit().await?;

        tracing::info!(trip_id = %trip.id, "Trip manually closed");

        let registration = self.registration_for(trip.vehicle_id).await;
        self.run_post_actions(post, &trip, &registration, request.reason.as_deref(), now)
            .await;

        Ok(trip)
    }

    /// PENDING → IN_PROGRESS with a fresh start time.
    pub async fn start_trip(&self, trip_id: Uuid) -> Result<Trip> {
        let mut tx = self.store.begin().await?;
        let mut trip = tx.load_trip_for_update(trip_id).await?;

        if !trip.status.can_transition_to(TripStatus::InProgress) {
            return Err(Error::Validation(format!(
                "Trip {} cannot start from {}",
                trip_id, trip.status
            )));
        }

        let now = Utc::now();
        trip.begin(now);
        tx.update_trip(&trip).await?;
        tx.commit().await?;

        tracing::info!(trip_id = %trip.id, vehicle_id = %trip.vehicle_id, "Trip started");

        let registration = self.registration_for(trip.vehicle_id).await;
        self.bus.publish_geofence(GeofenceNotice::trip_started(
            trip.vehicle_id,
            trip.id,
            registration,
            now,
        ));

        Ok(trip)
    }

    /// Admin reset: every trip back to PENDING with its history deleted and
    /// pickups pending, then the static caches evicted. Fails with a
    /// validation error when there is nothing to reset.
    pub async fn reset_all(&self) -> Result<usize> {
        let trips = self.store.list_trips().await?;
        if trips.is_empty() {
            return Err(Error::Validation("No trips to reset".to_string()));
        }

        for trip in &trips {
            let mut tx = self.store.begin().await?;
            let mut locked = tx.load_trip_for_update(trip.id).await?;
            tx.delete_trip_history(locked.id).await?;
            tx.reset_pickups(locked.id).await?;
            locked.reset();
            tx.update_trip(&locked).await?;
            tx.commit().await?;
        }

        self.static_data.evict_all();

        let now = Utc::now();
        for trip in &trips {
            let registration = self.registration_for(trip.vehicle_id).await;
            self.bus.publish_geofence(GeofenceNotice::trip_reset(
                trip.vehicle_id,
                trip.id,
                registration,
                now,
            ));
        }

        tracing::info!(trips = trips.len(), "All trips reset");
        Ok(trips.len())
    }

    /// Applies engine effects in order. State mutations go to the
    /// transaction and the in-memory trip; notifier and bus work is deferred
    /// until after commit. Audit writes are best-effort.
    async fn apply_effects(
        &self,
        tx: &mut Box<dyn StoreTx>,
        trip: &mut Trip,
        effects: &[EngineEffect],
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<PostAction>> {
        let mut post = Vec::new();
        for effect in effects {
            match effect {
                EngineEffect::MarkPickupArrived(pickup_id) => {
                    tx.set_pickup_status(*pickup_id, PickupStatus::Arrived).await?;
                }
                EngineEffect::EmitEvent {
                    kind,
                    latitude,
                    longitude,
                } => {
                    let event = NewEvent {
                        vehicle_id: trip.vehicle_id,
                        trip_id: Some(trip.id),
                        event_type: *kind,
                        latitude: *latitude,
                        longitude: *longitude,
                        event_timestamp: now,
                    };
                    if let Err(e) = tx.save_event(event).await {
                        // Losing an audit row must not stop the state machine.
                        tracing::warn!(
                            trip_id = %trip.id,
                            kind = %kind,
                            error = %e,
                            "Audit event write failed; continuing"
                        );
                    }
                }
                EngineEffect::SetOfficeEntry(entry) => {
                    trip.office_entry_time = *entry;
                }
                EngineEffect::CompleteTrip {
                    end_time,
                    duration_minutes,
                } => {
                    trip.complete(*end_time, *duration_minutes);
                }
                EngineEffect::NotifyPickup {
                    latitude,
                    longitude,
                } => post.push(PostAction::NotifyPickup {
                    latitude: *latitude,
                    longitude: *longitude,
                }),
                EngineEffect::NotifyCompletion => post.push(PostAction::NotifyCompletion),
                EngineEffect::NotifyAdminAlert => post.push(PostAction::NotifyAdminAlert),
                EngineEffect::PublishGeofence(kind) => post.push(PostAction::Publish {
                    kind: *kind,
                    latitude,
                    longitude,
                }),
            }
        }
        Ok(post)
    }

    async fn run_post_actions(
        &self,
        actions: Vec<PostAction>,
        trip: &Trip,
        registration: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) {
        for action in actions {
            match action {
                PostAction::NotifyPickup {
                    latitude,
                    longitude,
                } => {
                    let result = self
                        .notifier
                        .pickup_arrival(trip.vehicle_id, trip.id, latitude, longitude)
                        .await;
                    log_notify_failure("pickup_arrival", trip.id, result);
                }
                PostAction::NotifyCompletion => {
                    let result = self
                        .notifier
                        .trip_completion(trip.vehicle_id, trip.id)
                        .await;
                    log_notify_failure("trip_completion", trip.id, result);
                }
                PostAction::NotifyAdminAlert => {
                    let reason = reason.unwrap_or("Manual closure outside geofence");
                    let result = self
                        .notifier
                        .admin_alert(trip.vehicle_id, trip.id, reason)
                        .await;
                    log_notify_failure("admin_alert", trip.id, result);
                }
                PostAction::Publish {
                    kind,
                    latitude,
                    longitude,
                } => {
                    self.bus.publish_geofence(GeofenceNotice::event(
                        kind,
                        trip.vehicle_id,
                        trip.id,
                        registration.to_string(),
                        latitude,
                        longitude,
                        now,
                    ));
                }
            }
        }
    }

    /// Post-commit registration lookup; failures degrade to an empty string
    /// rather than failing the already committed request.
    async fn registration_for(&self, vehicle_id: Uuid) -> String {
        match self.static_data.registration_for(vehicle_id).await {
            Ok(Some(registration)) => registration,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(vehicle_id = %vehicle_id, error = %e, "Vehicle lookup failed");
                String::new()
            }
        }
    }
}

fn log_notify_failure(channel: &str, trip_id: Uuid, result: NotifyResult) {
    if let NotifyResult::Failed(reason) = result {
        tracing::warn!(trip_id = %trip_id, channel, reason, "Notification failed");
    }
}
