use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::routes::{audit, dashboard, geofences, health, locations, trips};
use domain::ports::event_bus::EventBus;
use domain::ports::notifier::{LoggingNotifier, Notifier};
use domain::ports::static_data::StaticDataProvider;
use domain::ports::store::Store;
use domain::services::{AuditQuery, IngressDispatcher, TripCoordinator};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub static_data: Arc<StaticDataProvider>,
    pub coordinator: Arc<TripCoordinator>,
    pub dispatcher: Arc<IngressDispatcher>,
    pub audit: Arc<AuditQuery>,
    pub bus: Arc<EventBus>,
    pub config: Arc<Config>,
    /// Prometheus scrape handle; absent when metrics are not installed
    /// (e.g. most tests).
    pub metrics: Option<PrometheusHandle>,
}

/// Wires the service graph and the router on top of any `Store`
/// implementation. The dispatcher spawns its worker pool on the current
/// runtime, so this must be called from within one.
pub fn create_app(
    config: Config,
    store: Arc<dyn Store>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier::new());
    create_app_with_notifier(config, store, notifier, metrics)
}

/// As [`create_app`], with an explicit notifier implementation.
pub fn create_app_with_notifier(
    config: Config,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let config = Arc::new(config);

    let bus = Arc::new(EventBus::new(config.bus.channel_capacity));
    let static_data = Arc::new(StaticDataProvider::new(
        store.clone(),
        config.cache_policy(),
    ));
    let coordinator = Arc::new(TripCoordinator::new(
        store.clone(),
        static_data.clone(),
        notifier,
        bus.clone(),
        config.engine_config(),
    ));
    let dispatcher = Arc::new(IngressDispatcher::new(
        coordinator.clone(),
        config.ingest_settings(),
    ));
    let audit = Arc::new(AuditQuery::new(store.clone()));

    let state = AppState {
        store,
        static_data,
        coordinator,
        dispatcher,
        audit,
        bus,
        config: config.clone(),
        metrics,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        // Location ingress
        .route("/location/update", post(locations::update))
        .route("/location/update/async", post(locations::update_async))
        .route("/location/batch", post(locations::batch))
        // Trip admin
        .route("/trip/:trip_id/manual-close", post(trips::manual_close))
        // Dashboard
        .route("/dashboard/start-trip/:trip_id", post(dashboard::start_trip))
        .route("/dashboard/reset", post(dashboard::reset))
        .route("/dashboard/data", get(dashboard::data))
        // Audit projections
        .route("/audit/trip/:trip_id", get(audit::by_trip))
        .route("/audit/vehicle/:vehicle_id", get(audit::by_vehicle))
        .route("/audit/events", get(audit::by_time_range))
        // Geofence CRUD
        .route("/geofences", get(geofences::list).post(geofences::create))
        .route(
            "/geofences/:geofence_id",
            get(geofences::get_one)
                .put(geofences::update)
                .delete(geofences::remove),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
