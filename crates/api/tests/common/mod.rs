//! Common test utilities for integration tests.
//!
//! The router is built over the in-memory store, so the full HTTP surface is
//! exercised without a database.

// Helper utilities shared across integration test binaries; not every test
// uses every helper.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use domain::models::{GeofenceShape, OfficeGeofence, Trip, TripStatus};
use domain::store::memory::MemoryStore;
use fleet_tracker_api::{app::create_app, config::Config};

pub const OFFICE_LAT: f64 = 12.9716;
pub const OFFICE_LON: f64 = 77.5946;
pub const PICKUP_LAT: f64 = 12.9520;
pub const PICKUP_LON: f64 = 77.5750;

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub vehicle_id: Uuid,
    pub trip_id: Uuid,
}

/// A router over a fresh in-memory store seeded with one active vehicle and
/// one IN_PROGRESS trip that started ten minutes ago.
pub fn build_app(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let vehicle_id = store.add_vehicle("KA-01-AB-1234");
    let trip_id = store.add_trip(vehicle_id, TripStatus::InProgress);
    store.put_trip(Trip {
        id: trip_id,
        vehicle_id,
        status: TripStatus::InProgress,
        start_time: Some(Utc::now() - Duration::minutes(10)),
        end_time: None,
        total_distance_km: 0.0,
        duration_minutes: None,
        office_entry_time: None,
    });

    let app = create_app(config, store.clone(), None);
    TestApp {
        app,
        store,
        vehicle_id,
        trip_id,
    }
}

/// Default test configuration: a couple of workers and a zero dwell so
/// office scenarios close on the second inside ping.
pub fn test_config(dwell_time_seconds: u64) -> Config {
    let mut config = Config::default();
    config.geofence.dwell_time_seconds = dwell_time_seconds;
    config.ingest.worker_count = 2;
    config
}

pub fn office_geofence() -> OfficeGeofence {
    OfficeGeofence {
        id: Uuid::new_v4(),
        name: Some("HQ".to_string()),
        latitude: OFFICE_LAT,
        longitude: OFFICE_LON,
        radius_meters: 100.0,
        shape: GeofenceShape::Circular,
        polygon: Vec::new(),
    }
}

pub fn ping_body(
    vehicle_id: Uuid,
    trip_id: Uuid,
    latitude: f64,
    longitude: f64,
    speed_kmh: f64,
    timestamp: &str,
) -> Value {
    serde_json::json!({
        "vehicleId": vehicle_id,
        "tripId": trip_id,
        "latitude": latitude,
        "longitude": longitude,
        "speedKmh": speed_kmh,
        "timestamp": timestamp,
    })
}

/// Sends one request and returns the status plus the parsed JSON body
/// (`Value::Null` for empty bodies).
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Audit event kinds for a trip, in response order.
pub async fn audit_kinds(app: &Router, trip_id: Uuid) -> Vec<String> {
    let (status, body) = send_json(app, "GET", &format!("/audit/trip/{trip_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    body["events"]
        .as_array()
        .expect("events array")
        .iter()
        .map(|e| e["eventType"].as_str().expect("eventType").to_string())
        .collect()
}
