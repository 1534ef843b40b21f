//! Geofence evaluation engine.
//!
//! Pure per-ping evaluation: given the locked trip, its pickups and the
//! office geofences, produce the ordered list of effects the coordinator
//! applies atomically. Keeping the engine free of I/O makes every dwell,
//! drift and idempotency rule testable with a fixed clock.

mod effects;
mod evaluator;

pub use effects::EngineEffect;
pub use evaluator::{evaluate, plan_manual_close};

/// Tunables for office-arrival detection.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Continuous seconds a vehicle must remain inside an office geofence
    /// before the trip may auto-close.
    pub dwell_time_seconds: u64,
    /// Pings at or above this speed never close a trip (drive-through
    /// defence).
    pub speed_threshold_kmh: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dwell_time_seconds: 30,
            speed_threshold_kmh: 5.0,
        }
    }
}
