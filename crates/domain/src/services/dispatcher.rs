//! Ingress dispatcher: sync, async and batch entry points.
//!
//! The async path feeds a bounded queue drained by a fixed set of worker
//! tasks. When the queue is full the submitting task executes the ping
//! itself (caller-runs); a submission is never dropped. The batch path is
//! deliberately sequential on the calling task so pings inside one batch
//! apply in device-timestamp order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use validator::Validate;

use crate::models::{BatchResult, LocationPing, Trip};
use crate::services::coordinator::TripCoordinator;
use crate::{Error, Result};

/// Queue and batch sizing.
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub max_batch_size: usize,
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            worker_count: 10,
            queue_capacity: 500,
        }
    }
}

pub struct IngressDispatcher {
    coordinator: Arc<TripCoordinator>,
    queue: mpsc::Sender<LocationPing>,
    settings: IngestSettings,
}

impl IngressDispatcher {
    /// Builds the dispatcher and spawns its worker pool on the current
    /// runtime.
    pub fn new(coordinator: Arc<TripCoordinator>, settings: IngestSettings) -> Self {
        let (queue, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));

        for worker in 0..settings.worker_count {
            let rx = rx.clone();
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only for the dequeue; processing
                    // runs unlocked so workers overlap.
                    let ping = { rx.lock().await.recv().await };
                    let Some(ping) = ping else { break };
                    if let Err(e) = coordinator.process_ping(&ping).await {
                        tracing::warn!(
                            worker,
                            trip_id = %ping.trip_id,
                            error = %e,
                            "Async ping processing failed"
                        );
                    }
                }
            });
        }

        Self {
            coordinator,
            queue,
            settings,
        }
    }

    /// Synchronous ingestion: validates, processes, and surfaces failures to
    /// the caller. Returns the committed trip snapshot.
    pub async fn sync(&self, ping: &LocationPing) -> Result<Trip> {
        ping.validate()
            .map_err(|e| Error::Validation(flatten_validation(&e)))?;
        self.coordinator.process_ping(ping).await
    }

    /// Asynchronous ingestion: enqueues for the worker pool. On a saturated
    /// queue the submitting task runs the ping inline; processing failures
    /// on this path are logged, never surfaced.
    pub async fn enqueue(&self, ping: LocationPing) -> Result<()> {
        ping.validate()
            .map_err(|e| Error::Validation(flatten_validation(&e)))?;

        match self.queue.try_send(ping) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(ping))
            | Err(mpsc::error::TrySendError::Closed(ping)) => {
                tracing::debug!(trip_id = %ping.trip_id, "Ingest queue saturated; running on caller");
                if let Err(e) = self.coordinator.process_ping(&ping).await {
                    tracing::warn!(
                        trip_id = %ping.trip_id,
                        error = %e,
                        "Caller-run ping processing failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Batch ingestion: rejects empty and oversize batches, sorts by device
    /// timestamp (stable, so equal timestamps keep input order) and applies
    /// each ping synchronously. A failing ping logs and the batch continues.
    pub async fn batch(&self, mut pings: Vec<LocationPing>) -> Result<BatchResult> {
        if pings.is_empty() {
            return Err(Error::Validation("Batch must not be empty".to_string()));
        }
        if pings.len() > self.settings.max_batch_size {
            return Err(Error::BatchTooLarge {
                size: pings.len(),
                max: self.settings.max_batch_size,
            });
        }

        pings.sort_by_key(|p| p.timestamp);

        let total = pings.len();
        let mut processed = 0;
        let mut failed = 0;
        for ping in &pings {
            match self.sync(ping).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        trip_id = %ping.trip_id,
                        error = %e,
                        "Batch ping failed; continuing"
                    );
                }
            }
        }

        Ok(BatchResult {
            total,
            processed,
            failed,
        })
    }
}

fn flatten_validation(errors: &validator::ValidationErrors) -> String {
    let messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                format!(
                    "{}: {}",
                    field,
                    e.message.as_ref().map(|m| m.to_string()).unwrap_or_default()
                )
            })
        })
        .collect();
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::models::{GeofenceEventKind, TripStatus};
    use crate::ports::event_bus::EventBus;
    use crate::ports::notifier::LoggingNotifier;
    use crate::ports::static_data::{CachePolicy, StaticDataProvider};
    use crate::ports::store::Store;
    use crate::store::memory::MemoryStore;
    use uuid::Uuid;

    struct Harness {
        store: Arc<MemoryStore>,
        dispatcher: IngressDispatcher,
        vehicle_id: Uuid,
        trip_id: Uuid,
    }

    fn harness(settings: IngestSettings) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let vehicle_id = store.add_vehicle("KA-01-AB-1234");
        let trip_id = store.add_trip(vehicle_id, TripStatus::InProgress);

        let static_data = Arc::new(StaticDataProvider::new(
            store.clone(),
            CachePolicy::default(),
        ));
        let coordinator = Arc::new(TripCoordinator::new(
            store.clone(),
            static_data,
            Arc::new(LoggingNotifier::new()),
            Arc::new(EventBus::new(64)),
            EngineConfig::default(),
        ));
        let dispatcher = IngressDispatcher::new(coordinator, settings);

        Harness {
            store,
            dispatcher,
            vehicle_id,
            trip_id,
        }
    }

    fn ping(h: &Harness, second: u32) -> LocationPing {
        ping_at(h, 12.9400 + f64::from(second) * 0.0001, second)
    }

    fn ping_at(h: &Harness, latitude: f64, second: u32) -> LocationPing {
        let json = serde_json::json!({
            "vehicleId": h.vehicle_id,
            "tripId": h.trip_id,
            "latitude": latitude,
            "longitude": 77.5600,
            "speedKmh": 12.0,
            "timestamp": format!("2026-03-14T09:30:{:02}", second),
        });
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_sync_rejects_invalid_ping() {
        let h = harness(IngestSettings::default());
        let mut bad = ping(&h, 1);
        bad.latitude = 200.0;

        let result = h.dispatcher.sync(&bad).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(h.store.latest_location(h.trip_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_rejects_empty() {
        let h = harness(IngestSettings::default());
        let result = h.dispatcher.batch(Vec::new()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_batch_rejects_oversize() {
        let h = harness(IngestSettings {
            max_batch_size: 2,
            ..IngestSettings::default()
        });
        let pings = vec![ping(&h, 1), ping(&h, 2), ping(&h, 3)];
        let result = h.dispatcher.batch(pings).await;
        assert!(matches!(
            result,
            Err(Error::BatchTooLarge { size: 3, max: 2 })
        ));
    }

    #[tokio::test]
    async fn test_batch_applies_in_device_timestamp_order() {
        let h = harness(IngestSettings::default());
        // Shuffled input; the trail must come out chronological.
        let pings = vec![ping(&h, 30), ping(&h, 10), ping(&h, 20)];

        let result = h.dispatcher.batch(pings).await.unwrap();
        assert_eq!(
            result,
            BatchResult {
                total: 3,
                processed: 3,
                failed: 0
            }
        );

        let trail = h.store.locations_for_trip(h.trip_id).await.unwrap();
        let seconds: Vec<String> = trail
            .iter()
            .map(|l| l.recorded_at.format("%S").to_string())
            .collect();
        assert_eq!(seconds, vec!["10", "20", "30"]);
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let h = harness(IngestSettings::default());
        let mut orphan = ping(&h, 2);
        orphan.trip_id = Uuid::new_v4();
        let pings = vec![ping(&h, 1), orphan, ping(&h, 3)];

        let result = h.dispatcher.batch(pings).await.unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.processed, 2);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_batch_matches_sorted_sync_replay() {
        // Batch equivalence law: a batch on a fresh trip leaves the same
        // audit trail as sorted sequential syncs.
        let batch_h = harness(IngestSettings::default());
        let office = crate::models::OfficeGeofence {
            id: Uuid::new_v4(),
            name: None,
            latitude: 12.9716,
            longitude: 77.5946,
            radius_meters: 100.0,
            shape: crate::models::GeofenceShape::Circular,
            polygon: Vec::new(),
        };
        batch_h.store.add_geofence(office.clone());
        batch_h
            .store
            .add_pickup(batch_h.trip_id, 12.9520, 77.5750, 50.0);

        let pickup_ping = {
            let json = serde_json::json!({
                "vehicleId": batch_h.vehicle_id,
                "tripId": batch_h.trip_id,
                "latitude": 12.9520,
                "longitude": 77.5750,
                "speedKmh": 10.0,
                "timestamp": "2026-03-14T09:30:05",
            });
            serde_json::from_value::<LocationPing>(json).unwrap()
        };
        let shuffled = vec![ping(&batch_h, 30), pickup_ping.clone(), ping(&batch_h, 20)];

        batch_h.dispatcher.batch(shuffled).await.unwrap();

        let sync_h = harness(IngestSettings::default());
        sync_h.store.add_geofence(office);
        sync_h
            .store
            .add_pickup(sync_h.trip_id, 12.9520, 77.5750, 50.0);
        let mut replay = pickup_ping;
        replay.vehicle_id = sync_h.vehicle_id;
        replay.trip_id = sync_h.trip_id;
        sync_h.dispatcher.sync(&replay).await.unwrap();
        sync_h.dispatcher.sync(&ping(&sync_h, 20)).await.unwrap();
        sync_h.dispatcher.sync(&ping(&sync_h, 30)).await.unwrap();

        let batch_kinds: Vec<GeofenceEventKind> = batch_h
            .store
            .events_for_trip(batch_h.trip_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        let sync_kinds: Vec<GeofenceEventKind> = sync_h
            .store
            .events_for_trip(sync_h.trip_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(batch_kinds, sync_kinds);
        assert_eq!(batch_kinds, vec![GeofenceEventKind::PickupArrived]);
    }

    #[tokio::test]
    async fn test_enqueue_is_processed_by_workers() {
        let h = harness(IngestSettings {
            worker_count: 2,
            ..IngestSettings::default()
        });

        h.dispatcher.enqueue(ping(&h, 1)).await.unwrap();

        // Poll until the worker picks it up.
        for _ in 0..100 {
            if h.store.latest_location(h.trip_id).await.unwrap().is_some() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("queued ping was never processed");
    }

    #[tokio::test]
    async fn test_enqueue_saturation_runs_on_caller() {
        // No workers and a single-slot queue: the second submission cannot
        // enqueue and must run inline on the submitting task.
        let h = harness(IngestSettings {
            worker_count: 0,
            queue_capacity: 1,
            ..IngestSettings::default()
        });

        h.dispatcher.enqueue(ping(&h, 1)).await.unwrap();
        h.dispatcher.enqueue(ping(&h, 2)).await.unwrap();

        let trail = h.store.locations_for_trip(h.trip_id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].recorded_at.format("%S").to_string(), "02");
    }

    #[tokio::test]
    async fn test_enqueue_rejects_invalid_ping() {
        let h = harness(IngestSettings::default());
        let mut bad = ping(&h, 1);
        bad.speed_kmh = -2.0;
        let result = h.dispatcher.enqueue(bad).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
