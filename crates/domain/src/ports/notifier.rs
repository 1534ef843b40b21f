//! Notification port for pickup / completion / admin-alert side effects.
//!
//! Delivery is at-least-once: the engine guarantees at most one invocation
//! per logical event per process lifetime, but a restart may retry. Failures
//! are logged and swallowed by callers.

use async_trait::async_trait;
use uuid::Uuid;

/// Result of a notification attempt.
#[derive(Debug, Clone)]
pub enum NotifyResult {
    /// Notification was handed to the provider.
    Sent,
    /// Delivery failed; callers log and continue.
    Failed(String),
}

/// Outbound side-effect port. Production wires push + SMS; tests and
/// development use [`LoggingNotifier`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A vehicle reached a pickup geofence.
    async fn pickup_arrival(
        &self,
        vehicle_id: Uuid,
        trip_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> NotifyResult;

    /// A trip auto-closed at the office.
    async fn trip_completion(&self, vehicle_id: Uuid, trip_id: Uuid) -> NotifyResult;

    /// A trip was manually closed outside every geofence.
    async fn admin_alert(&self, vehicle_id: Uuid, trip_id: Uuid, reason: &str) -> NotifyResult;
}

/// Tracing-only notifier for development and testing.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn pickup_arrival(
        &self,
        vehicle_id: Uuid,
        trip_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> NotifyResult {
        tracing::info!(
            vehicle_id = %vehicle_id,
            trip_id = %trip_id,
            latitude,
            longitude,
            "Pickup arrival notification"
        );
        NotifyResult::Sent
    }

    async fn trip_completion(&self, vehicle_id: Uuid, trip_id: Uuid) -> NotifyResult {
        tracing::info!(
            vehicle_id = %vehicle_id,
            trip_id = %trip_id,
            "Trip completion notification"
        );
        NotifyResult::Sent
    }

    async fn admin_alert(&self, vehicle_id: Uuid, trip_id: Uuid, reason: &str) -> NotifyResult {
        tracing::warn!(
            vehicle_id = %vehicle_id,
            trip_id = %trip_id,
            reason,
            "Admin alert notification"
        );
        NotifyResult::Sent
    }
}
