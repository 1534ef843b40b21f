//! Per-ping evaluation rules.

use chrono::{DateTime, Utc};

use super::{EngineConfig, EngineEffect};
use crate::models::{
    GeofenceEventKind, LocationPing, OfficeGeofence, PickupPoint, PickupStatus, Trip, TripStatus,
};
use crate::{Error, Result};

/// Evaluates one ping against a trip.
///
/// `office_reached_recorded` is the committed answer to
/// `exists_event(trip, OFFICE_REACHED)`, read by the coordinator under the
/// row lock. `now` is the server clock at evaluation; it stamps every audit
/// row and drives all dwell arithmetic. Device time never enters here.
pub fn evaluate(
    trip: &Trip,
    ping: &LocationPing,
    pickups: &[PickupPoint],
    geofences: &[OfficeGeofence],
    office_reached_recorded: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<EngineEffect> {
    let mut effects = Vec::new();
    evaluate_pickups(ping, pickups, &mut effects);
    evaluate_office(
        trip,
        ping,
        pickups,
        geofences,
        office_reached_recorded,
        now,
        config,
        &mut effects,
    );
    effects
}

/// Pickup arrivals, in pickup id order. A pickup already ARRIVED is skipped,
/// which is what makes replayed pings idempotent.
fn evaluate_pickups(ping: &LocationPing, pickups: &[PickupPoint], effects: &mut Vec<EngineEffect>) {
    let mut ordered: Vec<&PickupPoint> = pickups.iter().collect();
    ordered.sort_by_key(|p| p.id);

    for pickup in ordered {
        if pickup.status == PickupStatus::Arrived {
            continue;
        }
        if pickup.contains(ping.point()) {
            effects.push(EngineEffect::MarkPickupArrived(pickup.id));
            effects.push(EngineEffect::EmitEvent {
                kind: GeofenceEventKind::PickupArrived,
                latitude: ping.latitude,
                longitude: ping.longitude,
            });
            effects.push(EngineEffect::NotifyPickup {
                latitude: ping.latitude,
                longitude: ping.longitude,
            });
            effects.push(EngineEffect::PublishGeofence(GeofenceEventKind::PickupArrived));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_office(
    trip: &Trip,
    ping: &LocationPing,
    pickups: &[PickupPoint],
    geofences: &[OfficeGeofence],
    office_reached_recorded: bool,
    now: DateTime<Utc>,
    config: &EngineConfig,
    effects: &mut Vec<EngineEffect>,
) {
    // First geofence whose containment predicate matches; overlapping fences
    // resolve by enumeration order.
    let inside = geofences.iter().any(|g| g.contains(ping.point()));

    // Drift reset: a stray outside ping while the dwell anchor is set means
    // the vehicle (or its GPS) left the fence; dwell restarts on re-entry.
    if !inside {
        if trip.office_entry_time.is_some() && trip.status == TripStatus::InProgress {
            effects.push(EngineEffect::SetOfficeEntry(None));
            effects.push(EngineEffect::EmitEvent {
                kind: GeofenceEventKind::GeofenceExit,
                latitude: ping.latitude,
                longitude: ping.longitude,
            });
        }
        return;
    }

    // Terminal idempotency: a completed (or never-started) trip ignores
    // office containment entirely.
    if trip.status != TripStatus::InProgress {
        return;
    }

    // Dwell anchor: first inside ping only arms the timer.
    let entered_at = match trip.office_entry_time {
        Some(entered_at) => entered_at,
        None => {
            effects.push(EngineEffect::SetOfficeEntry(Some(now)));
            return;
        }
    };

    let dwell_seconds = (now - entered_at).num_seconds();
    if dwell_seconds < config.dwell_time_seconds as i64 {
        return;
    }

    // Drive-through defence: strict `<` threshold closes, `>=` never does.
    if ping.speed_kmh >= config.speed_threshold_kmh {
        return;
    }

    // Multi-stop gating: every owned pickup must be ARRIVED.
    if pickups.iter().any(|p| p.status != PickupStatus::Arrived) {
        effects.push(EngineEffect::EmitEvent {
            kind: GeofenceEventKind::TripClosureBlockedPendingPickups,
            latitude: ping.latitude,
            longitude: ping.longitude,
        });
        return;
    }

    // Secondary idempotency guard against a lock released between retries.
    if office_reached_recorded {
        return;
    }

    let duration_minutes = trip
        .start_time
        .map(|start| (now - start).num_minutes())
        .unwrap_or(0);

    effects.push(EngineEffect::EmitEvent {
        kind: GeofenceEventKind::OfficeReached,
        latitude: ping.latitude,
        longitude: ping.longitude,
    });
    effects.push(EngineEffect::CompleteTrip {
        end_time: now,
        duration_minutes,
    });
    effects.push(EngineEffect::EmitEvent {
        kind: GeofenceEventKind::TripCompleted,
        latitude: ping.latitude,
        longitude: ping.longitude,
    });
    effects.push(EngineEffect::NotifyCompletion);
    effects.push(EngineEffect::PublishGeofence(GeofenceEventKind::TripCompleted));
}

/// Plans a manual closure at the given position.
///
/// Inside any geofence the closure is routine; outside, it is recorded as
/// out-of-geofence and escalated to an admin. Either way the trip completes.
pub fn plan_manual_close(
    trip: &Trip,
    latitude: f64,
    longitude: f64,
    geofences: &[OfficeGeofence],
    now: DateTime<Utc>,
) -> Result<Vec<EngineEffect>> {
    match trip.status {
        TripStatus::Completed => return Err(Error::AlreadyTerminal(trip.id)),
        TripStatus::Pending => {
            return Err(Error::Validation(format!(
                "Trip {} has not started and cannot be closed",
                trip.id
            )))
        }
        TripStatus::InProgress => {}
    }

    let point = crate::geo::GeoPoint::new(latitude, longitude);
    let inside = geofences.iter().any(|g| g.contains(point));

    let mut effects = Vec::new();
    if inside {
        effects.push(EngineEffect::EmitEvent {
            kind: GeofenceEventKind::ManualClosure,
            latitude,
            longitude,
        });
        effects.push(EngineEffect::PublishGeofence(GeofenceEventKind::ManualClosure));
    } else {
        effects.push(EngineEffect::EmitEvent {
            kind: GeofenceEventKind::ManualClosureOutsideGeofence,
            latitude,
            longitude,
        });
        effects.push(EngineEffect::EmitEvent {
            kind: GeofenceEventKind::AdminAlert,
            latitude,
            longitude,
        });
        effects.push(EngineEffect::NotifyAdminAlert);
        effects.push(EngineEffect::PublishGeofence(
            GeofenceEventKind::ManualClosureOutsideGeofence,
        ));
    }

    let duration_minutes = trip
        .start_time
        .map(|start| (now - start).num_minutes())
        .unwrap_or(0);
    effects.push(EngineEffect::CompleteTrip {
        end_time: now,
        duration_minutes,
    });

    Ok(effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::{GeofenceShape, OfficeGeofence};
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    const OFFICE_LAT: f64 = 12.9716;
    const OFFICE_LON: f64 = 77.5946;

    fn office() -> OfficeGeofence {
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

    fn polygon_office() -> OfficeGeofence {
        OfficeGeofence {
            id: Uuid::new_v4(),
            name: Some("Campus".to_string()),
            latitude: OFFICE_LAT,
            longitude: OFFICE_LON,
            radius_meters: 1.0,
            shape: GeofenceShape::Polygon,
            polygon: vec![
                GeoPoint::new(12.9700, 77.5930),
                GeoPoint::new(12.9700, 77.5960),
                GeoPoint::new(12.9730, 77.5960),
                GeoPoint::new(12.9730, 77.5930),
            ],
        }
    }

    fn in_progress_trip(start: DateTime<Utc>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            status: TripStatus::InProgress,
            start_time: Some(start),
            end_time: None,
            total_distance_km: 0.0,
            duration_minutes: None,
            office_entry_time: None,
        }
    }

    fn ping(trip: &Trip, latitude: f64, longitude: f64, speed_kmh: f64) -> LocationPing {
        let json = serde_json::json!({
            "vehicleId": trip.vehicle_id,
            "tripId": trip.id,
            "latitude": latitude,
            "longitude": longitude,
            "speedKmh": speed_kmh,
            "timestamp": "2026-03-14T09:30:00",
        });
        serde_json::from_value(json).unwrap()
    }

    fn pickup(trip: &Trip, status: PickupStatus) -> PickupPoint {
        PickupPoint {
            id: Uuid::new_v4(),
            trip_id: trip.id,
            latitude: 12.9520,
            longitude: 77.5750,
            radius_meters: 50.0,
            status,
        }
    }

    fn emitted_kinds(effects: &[EngineEffect]) -> Vec<GeofenceEventKind> {
        effects
            .iter()
            .filter_map(|e| match e {
                EngineEffect::EmitEvent { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_pending_pickup_inside_fires_full_effect_set() {
        let trip = in_progress_trip(now() - Duration::minutes(10));
        let p = pickup(&trip, PickupStatus::Pending);
        let ping = ping(&trip, 12.9520, 77.5750, 10.0);

        let effects = evaluate(&trip, &ping, &[p.clone()], &[], false, now(), &EngineConfig::default());

        assert_eq!(effects[0], EngineEffect::MarkPickupArrived(p.id));
        assert_eq!(
            emitted_kinds(&effects),
            vec![GeofenceEventKind::PickupArrived]
        );
        assert!(effects
            .iter()
            .any(|e| matches!(e, EngineEffect::NotifyPickup { .. })));
        assert!(effects
            .iter()
            .any(|e| *e == EngineEffect::PublishGeofence(GeofenceEventKind::PickupArrived)));
    }

    #[test]
    fn test_arrived_pickup_is_skipped() {
        let trip = in_progress_trip(now() - Duration::minutes(10));
        let p = pickup(&trip, PickupStatus::Arrived);
        let ping = ping(&trip, 12.9520, 77.5750, 10.0);

        let effects = evaluate(&trip, &ping, &[p], &[], false, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_pickup_effects_follow_id_order() {
        let trip = in_progress_trip(now() - Duration::minutes(10));
        let mut a = pickup(&trip, PickupStatus::Pending);
        let mut b = pickup(&trip, PickupStatus::Pending);
        // Force a known ordering regardless of generation order.
        a.id = Uuid::from_u128(2);
        b.id = Uuid::from_u128(1);
        let ping = ping(&trip, 12.9520, 77.5750, 10.0);

        let effects = evaluate(
            &trip,
            &ping,
            &[a.clone(), b.clone()],
            &[],
            false,
            now(),
            &EngineConfig::default(),
        );

        let marks: Vec<Uuid> = effects
            .iter()
            .filter_map(|e| match e {
                EngineEffect::MarkPickupArrived(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(marks, vec![b.id, a.id]);
    }

    #[test]
    fn test_first_inside_ping_sets_dwell_anchor_only() {
        let trip = in_progress_trip(now() - Duration::minutes(10));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert_eq!(effects, vec![EngineEffect::SetOfficeEntry(Some(now()))]);
    }

    #[test]
    fn test_dwell_below_threshold_does_not_close() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(29));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_dwell_exactly_at_threshold_closes() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(30));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert_eq!(
            emitted_kinds(&effects),
            vec![
                GeofenceEventKind::OfficeReached,
                GeofenceEventKind::TripCompleted
            ]
        );
        assert!(effects.iter().any(|e| matches!(
            e,
            EngineEffect::CompleteTrip {
                duration_minutes: 10,
                ..
            }
        )));
        assert!(effects.iter().any(|e| *e == EngineEffect::NotifyCompletion));
    }

    #[test]
    fn test_speed_at_threshold_blocks_closure() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 5.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_speed_just_below_threshold_closes() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 4.99);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert_eq!(
            emitted_kinds(&effects),
            vec![
                GeofenceEventKind::OfficeReached,
                GeofenceEventKind::TripCompleted
            ]
        );
    }

    #[test]
    fn test_drift_reset_clears_anchor_and_emits_exit() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(20));
        let ping = ping(&trip, 12.9800, 77.6050, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert_eq!(
            effects,
            vec![
                EngineEffect::SetOfficeEntry(None),
                EngineEffect::EmitEvent {
                    kind: GeofenceEventKind::GeofenceExit,
                    latitude: 12.9800,
                    longitude: 77.6050,
                },
            ]
        );
    }

    #[test]
    fn test_outside_ping_without_anchor_is_noop() {
        let trip = in_progress_trip(now() - Duration::minutes(10));
        let ping = ping(&trip, 12.9800, 77.6050, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_completed_trip_ignores_office_containment() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.complete(now() - Duration::minutes(1), 9);
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_pending_pickup_blocks_closure() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let blocked = pickup(&trip, PickupStatus::Pending);
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(
            &trip,
            &ping,
            &[blocked],
            &[office()],
            false,
            now(),
            &EngineConfig::default(),
        );
        assert_eq!(
            emitted_kinds(&effects),
            vec![GeofenceEventKind::TripClosureBlockedPendingPickups]
        );
        assert!(!effects
            .iter()
            .any(|e| matches!(e, EngineEffect::CompleteTrip { .. })));
    }

    #[test]
    fn test_empty_pickup_set_passes_multi_stop_gate() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], false, now(), &EngineConfig::default());
        assert!(effects
            .iter()
            .any(|e| matches!(e, EngineEffect::CompleteTrip { .. })));
    }

    #[test]
    fn test_recorded_office_event_suppresses_duplicate_closure() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(&trip, &ping, &[], &[office()], true, now(), &EngineConfig::default());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_polygon_office_containment_closes() {
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let ping = ping(&trip, 12.9716, 77.5946, 2.0);

        let effects = evaluate(
            &trip,
            &ping,
            &[],
            &[polygon_office()],
            false,
            now(),
            &EngineConfig::default(),
        );
        assert!(effects
            .iter()
            .any(|e| matches!(e, EngineEffect::CompleteTrip { .. })));
    }

    #[test]
    fn test_pickup_and_office_effects_in_one_ping_keep_order() {
        // A pickup circle overlapping the office: pickup effects must come
        // before any office effect.
        let mut trip = in_progress_trip(now() - Duration::minutes(10));
        trip.office_entry_time = Some(now() - Duration::seconds(45));
        let mut p = pickup(&trip, PickupStatus::Pending);
        p.latitude = OFFICE_LAT;
        p.longitude = OFFICE_LON;
        let ping = ping(&trip, OFFICE_LAT, OFFICE_LON, 2.0);

        let effects = evaluate(
            &trip,
            &ping,
            &[p.clone()],
            &[office()],
            false,
            now(),
            &EngineConfig::default(),
        );

        assert_eq!(effects[0], EngineEffect::MarkPickupArrived(p.id));
        let kinds = emitted_kinds(&effects);
        assert_eq!(
            kinds,
            vec![
                GeofenceEventKind::PickupArrived,
                GeofenceEventKind::OfficeReached,
                GeofenceEventKind::TripCompleted,
            ]
        );
    }

    #[test]
    fn test_manual_close_inside_geofence() {
        let trip = in_progress_trip(now() - Duration::minutes(25));
        let effects =
            plan_manual_close(&trip, OFFICE_LAT, OFFICE_LON, &[office()], now()).unwrap();

        assert_eq!(emitted_kinds(&effects), vec![GeofenceEventKind::ManualClosure]);
        assert!(effects.iter().any(|e| matches!(
            e,
            EngineEffect::CompleteTrip {
                duration_minutes: 25,
                ..
            }
        )));
        assert!(!effects.iter().any(|e| *e == EngineEffect::NotifyAdminAlert));
    }

    #[test]
    fn test_manual_close_outside_geofence_escalates() {
        let trip = in_progress_trip(now() - Duration::minutes(25));
        let effects = plan_manual_close(&trip, 12.9000, 77.5000, &[office()], now()).unwrap();

        assert_eq!(
            emitted_kinds(&effects),
            vec![
                GeofenceEventKind::ManualClosureOutsideGeofence,
                GeofenceEventKind::AdminAlert,
            ]
        );
        assert!(effects.iter().any(|e| *e == EngineEffect::NotifyAdminAlert));
    }

    #[test]
    fn test_manual_close_terminal_trip_fails() {
        let mut trip = in_progress_trip(now() - Duration::minutes(25));
        trip.complete(now(), 25);

        let result = plan_manual_close(&trip, OFFICE_LAT, OFFICE_LON, &[office()], now());
        assert!(matches!(result, Err(Error::AlreadyTerminal(_))));
    }

    #[test]
    fn test_manual_close_pending_trip_fails_validation() {
        let mut trip = in_progress_trip(now());
        trip.status = TripStatus::Pending;
        trip.start_time = None;

        let result = plan_manual_close(&trip, OFFICE_LAT, OFFICE_LON, &[office()], now());
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
