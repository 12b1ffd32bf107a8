//! Route optimizer tests
//!
//! Tests for categorization, pack invariants, itinerary timing, comparison
//! and the request/response shapes.

mod fixtures;

use std::collections::HashMap;

use pack_planner::config::PlannerOptions;
use pack_planner::model::{Coordinates, PlanRequest, Route, StopType, UnassignedReason, WalkType};
use pack_planner::solver::{plan_route, RouteOptimizer};
use pack_planner::time::TimeOfDay;
use pack_planner::trace::TraceEvent;
use pack_planner::traits::TravelEstimator;

use fixtures::{hm, TestAppointment, ANTHEM_HILLS_PARK, GREEN_VALLEY_PARK};

// ============================================================================
// Helper Functions
// ============================================================================

fn request(appointments: Vec<TestAppointment>) -> PlanRequest {
    PlanRequest {
        appointments: appointments.into_iter().map(TestAppointment::build).collect(),
        ..PlanRequest::default()
    }
}

fn plan(request: &PlanRequest) -> Route {
    plan_route(request, PlannerOptions::default()).route
}

fn stop_types(route: &Route) -> Vec<StopType> {
    route.route.iter().map(|stop| stop.stop_type).collect()
}

fn pickup_times(route: &Route) -> HashMap<&str, TimeOfDay> {
    route
        .route
        .iter()
        .filter(|stop| stop.stop_type == StopType::Pickup)
        .map(|stop| (stop.appointment_id.as_str(), stop.start_time))
        .collect()
}

/// Checks pack capacity, pickup windows and walk tolerances along the route.
fn assert_pack_invariants(route: &Route, request: &PlanRequest) {
    let windows: HashMap<&str, (TimeOfDay, TimeOfDay)> = request
        .appointments
        .iter()
        .filter_map(|a| a.pickup_window().map(|w| (a.id.as_str(), (w.start, w.end))))
        .collect();
    let pickups = pickup_times(route);

    let mut pack_size = 0usize;
    for stop in &route.route {
        match stop.stop_type {
            StopType::Pickup => {
                pack_size += 1;
                assert!(pack_size <= 4, "pack grew to {pack_size} at stop {}", stop.id);
                let (start, end) = windows[stop.appointment_id.as_str()];
                assert!(
                    start <= stop.start_time && stop.start_time <= end,
                    "{} picked up at {} outside {}-{}",
                    stop.appointment_id,
                    stop.start_time,
                    start,
                    end
                );
            }
            StopType::Dropoff => {
                pack_size -= 1;
                let picked = pickups[stop.appointment_id.as_str()];
                let elapsed = stop.start_time.minutes_since(picked);
                let target = stop.duration as f64;
                if stop.overdue {
                    assert!(
                        elapsed > target + 10.0,
                        "{} dropped as overdue after {elapsed}",
                        stop.appointment_id
                    );
                } else {
                    assert!(
                        (target - 10.0..=target + 10.0).contains(&elapsed),
                        "{} walked {elapsed} minutes for a {target} minute walk",
                        stop.appointment_id
                    );
                }
            }
            StopType::Solo => assert_eq!(pack_size, 0, "solo walk started with dogs in the pack"),
        }
    }
    assert_eq!(pack_size, 0, "dogs left in the pack at end of day");
}

// ============================================================================
// Empty and Excluded Input
// ============================================================================

#[test]
fn test_empty_request_yields_empty_route() {
    let route = plan(&PlanRequest::default());

    assert!(route.route.is_empty());
    assert_eq!(route.total_distance, 0.0);
    assert_eq!(route.total_travel_time, 0.0);
    assert_eq!(route.total_walk_time, 0);
    assert_eq!(route.total_time, 0.0);
    assert!(!route.optimized);
    assert!(route.message.is_some());
}

#[test]
fn test_unplannable_appointments_are_reported_not_fatal() {
    let request = request(vec![
        TestAppointment::new("no-geo").ungeocoded(),
        TestAppointment::new("bad-time").window("noonish", "13:00"),
        TestAppointment::new("ok"),
    ]);

    let route = plan(&request);

    assert!(route.optimized);
    assert_eq!(route.route.len(), 2, "ok gets a pickup and a drop-off");
    let reasons: Vec<(&str, UnassignedReason)> = route
        .unassigned
        .iter()
        .map(|u| (u.appointment_id.as_str(), u.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("no-geo", UnassignedReason::MissingLocation),
            ("bad-time", UnassignedReason::InvalidWindow)
        ]
    );
}

#[test]
fn test_out_of_range_durations_are_reported() {
    let request = request(vec![
        TestAppointment::new("endless").solo().duration(40_000_000),
        TestAppointment::new("instant").duration(0),
        TestAppointment::new("a"),
        TestAppointment::new("b").at(GREEN_VALLEY_PARK.north(0.2)),
    ]);

    let outcome = plan_route(&request, PlannerOptions::default());
    let route = &outcome.route;

    let reasons: Vec<(&str, UnassignedReason)> = route
        .unassigned
        .iter()
        .map(|u| (u.appointment_id.as_str(), u.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("endless", UnassignedReason::InvalidDuration),
            ("instant", UnassignedReason::InvalidDuration)
        ]
    );
    // The bad walk does not knock the others out of their pack.
    assert_eq!(route.groups_count, 1);
    assert_eq!(route.route.len(), 4);
    assert!(
        !outcome
            .trace
            .events
            .iter()
            .any(|e| matches!(e, TraceEvent::AutoGroupingFallback { .. }))
    );
    assert_pack_invariants(route, &request);
}

#[test]
fn test_all_excluded_is_empty_route() {
    let request = request(vec![TestAppointment::new("no-geo").ungeocoded()]);

    let route = plan(&request);

    assert!(!route.optimized);
    assert!(route.route.is_empty());
    assert_eq!(route.unassigned.len(), 1);
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn test_nearby_overlapping_dogs_share_a_pack() {
    let request = request(vec![
        TestAppointment::new("a").at(GREEN_VALLEY_PARK.coords()),
        TestAppointment::new("b").at(GREEN_VALLEY_PARK.north(0.2)),
    ]);

    let route = plan(&request);

    assert_eq!(route.groups_count, 1);
    assert_eq!(route.solo_count, 0);
    assert_eq!(
        stop_types(&route),
        vec![StopType::Pickup, StopType::Pickup, StopType::Dropoff, StopType::Dropoff]
    );
    let pickups = pickup_times(&route);
    assert_eq!(pickups["a"], hm(10, 0));
    // 5 minute pickup, then 0.2 miles at 3 mph.
    assert_eq!(pickups["b"], hm(10, 9));
    assert!(route.route.iter().all(|s| s.walk_group_id.as_deref() == Some("auto-1")));
    assert_eq!(route.total_walk_time, 60);
    assert_pack_invariants(&route, &request);
}

#[test]
fn test_solo_and_training_never_share_a_pack() {
    let request = request(vec![
        TestAppointment::new("solo").solo().in_group("morning").window("08:00", "08:30"),
        TestAppointment::new("training").walk_type(WalkType::Training).window("09:00", "09:30"),
        TestAppointment::new("group").in_group("morning"),
        TestAppointment::new("other").walk_type(WalkType::Other).window("11:00", "11:30"),
    ]);

    let route = plan(&request);

    assert_eq!(route.solo_count, 2);
    assert!(route.unassigned.is_empty());
    assert!(route.warnings.is_empty());
    for stop in &route.route {
        match stop.walk_type {
            WalkType::Solo | WalkType::Training => {
                assert_eq!(stop.stop_type, StopType::Solo);
                assert!(stop.walk_group_id.is_none());
            }
            _ => assert_ne!(stop.stop_type, StopType::Solo),
        }
    }
    // "group" is alone in its manual group, "other" is auto-grouped.
    let group_ids: Vec<Option<&str>> = route
        .route
        .iter()
        .filter(|s| s.stop_type == StopType::Pickup)
        .map(|s| s.walk_group_id.as_deref())
        .collect();
    assert!(group_ids.contains(&Some("morning")));
    assert!(group_ids.contains(&Some("auto-1")));
}

#[test]
fn test_far_apart_dogs_are_walked_separately() {
    let request = request(vec![
        TestAppointment::new("green-valley").at(GREEN_VALLEY_PARK.coords()),
        TestAppointment::new("anthem").at(ANTHEM_HILLS_PARK.coords()).window("13:00", "13:30"),
    ]);

    let route = plan(&request);

    assert_eq!(route.groups_count, 2);
    let labels: Vec<&str> = route.route.iter().filter_map(|s| s.walk_group_id.as_deref()).collect();
    assert!(labels.contains(&"auto-1") && labels.contains(&"auto-2"));
    assert_pack_invariants(&route, &request);
}

// ============================================================================
// Pack Invariants
// ============================================================================

#[test]
fn test_pack_never_exceeds_four_dogs() {
    let appointments = (0..6)
        .map(|i| {
            TestAppointment::new(&format!("dog{i}"))
                .at(GREEN_VALLEY_PARK.coords())
                .window("09:00", "10:00")
                .in_group("big-pack")
        })
        .collect();
    let request = request(appointments);

    let route = plan(&request);

    assert_eq!(route.route.len(), 12, "every dog picked up and dropped off");
    assert!(route.unassigned.is_empty());
    assert_pack_invariants(&route, &request);
}

#[test]
fn test_mixed_durations_respect_tolerance() {
    let request = request(vec![
        TestAppointment::new("short")
            .duration(20)
            .window("08:00", "08:30")
            .at(GREEN_VALLEY_PARK.coords()),
        TestAppointment::new("long")
            .duration(60)
            .window("08:00", "08:45")
            .at(GREEN_VALLEY_PARK.north(0.1)),
        TestAppointment::new("mid")
            .duration(45)
            .window("08:10", "08:40")
            .at(GREEN_VALLEY_PARK.north(0.3)),
        TestAppointment::new("late")
            .duration(30)
            .window("08:30", "09:00")
            .at(GREEN_VALLEY_PARK.north(0.2)),
    ]);

    let route = plan(&request);

    assert_eq!(route.groups_count, 1);
    assert_eq!(route.route.len(), 8);
    assert_pack_invariants(&route, &request);
}

#[test]
fn test_urgent_window_is_picked_up_first() {
    let mut request = request(vec![
        TestAppointment::new("relaxed")
            .at(GREEN_VALLEY_PARK.coords())
            .window("08:00", "12:00")
            .in_group("pack"),
        TestAppointment::new("urgent")
            .at(GREEN_VALLEY_PARK.north(0.2))
            .window("08:00", "10:05")
            .in_group("pack"),
    ]);
    request.current_time = Some(hm(10, 0));

    let route = plan(&request);

    let first = &route.route[0];
    assert_eq!(first.appointment_id, "urgent");
    assert_eq!(first.stop_type, StopType::Pickup);
    assert!(first.start_time <= hm(10, 5));
    assert_pack_invariants(&route, &request);
}

#[test]
fn test_unreachable_member_is_reported() {
    let request = request(vec![
        TestAppointment::new("long-solo").solo().window("08:00", "08:10").duration(90),
        TestAppointment::new("missed").window("09:00", "09:10").in_group("late"),
        TestAppointment::new("caught").window("09:00", "12:00").in_group("late"),
    ]);

    let outcome = plan_route(&request, PlannerOptions::default());
    let route = &outcome.route;

    assert_eq!(route.unassigned.len(), 1);
    assert_eq!(route.unassigned[0].appointment_id, "missed");
    assert_eq!(route.unassigned[0].reason, UnassignedReason::WindowUnreachable);
    assert!(route.route.iter().all(|s| s.appointment_id != "missed"));
    assert_eq!(route.total_walk_time, 90 + 30);
    assert!(outcome.trace.events.iter().any(|e| matches!(e, TraceEvent::Unreachable { .. })));
    assert_pack_invariants(route, &request);
}

// ============================================================================
// Itinerary Timing
// ============================================================================

#[test]
fn test_late_unit_is_still_served_with_warning() {
    let request = request(vec![
        TestAppointment::new("first").solo().window("09:00", "09:15").duration(60),
        TestAppointment::new("second")
            .solo()
            .window("09:00", "09:30")
            .at(GREEN_VALLEY_PARK.north(0.5)),
    ]);

    let outcome = plan_route(&request, PlannerOptions::default());
    let route = &outcome.route;

    assert_eq!(stop_types(route), vec![StopType::Solo, StopType::Solo]);
    assert_eq!(route.route[0].start_time, hm(9, 0));
    assert_eq!(route.route[0].end_time, hm(10, 0));
    // Half a mile on foot after the first walk ends.
    assert_eq!(route.route[1].start_time, hm(10, 10));
    assert_eq!(route.warnings.len(), 1);
    assert!(outcome.trace.events.iter().any(|e| matches!(
        e,
        TraceEvent::SchedulingConflict { unit, .. } if unit == "solo-second"
    )));
}

#[test]
fn test_units_are_ordered_by_earliest_pickup() {
    let request = request(vec![
        TestAppointment::new("afternoon").solo().window("14:00", "14:30"),
        TestAppointment::new("morning").solo().window("08:00", "08:30"),
    ]);

    let route = plan(&request);

    let order: Vec<&str> = route.route.iter().map(|s| s.appointment_id.as_str()).collect();
    assert_eq!(order, vec!["morning", "afternoon"]);
    assert_eq!(route.route[1].start_time, hm(14, 0), "walker waits for the window");
}

#[test]
fn test_replanning_starts_from_current_time() {
    let mut request = request(vec![
        TestAppointment::new("flexible").solo().window("09:00", "17:00"),
    ]);

    assert_eq!(plan(&request).route[0].start_time, hm(9, 0));

    request.current_time = Some(hm(13, 0));
    assert_eq!(plan(&request).route[0].start_time, hm(13, 0));

    request.current_time = Some(hm(19, 0));
    assert_eq!(plan(&request).route[0].start_time, hm(9, 0));
}

#[test]
fn test_start_location_adds_first_leg_time() {
    let mut request = request(vec![TestAppointment::new("walk").solo().window("09:00", "17:00")]);
    request.start_location = Some(GREEN_VALLEY_PARK.north(-1.0));

    let route = plan(&request);

    // One mile at 3 mph.
    assert_eq!(route.route[0].start_time, hm(9, 20));
    // The leg from home is not part of the stop path.
    assert_eq!(route.total_distance, 0.0);
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_grouping_beats_input_order() {
    let mut request = request(vec![
        TestAppointment::new("a").at(GREEN_VALLEY_PARK.coords()).window("09:00", "09:30"),
        TestAppointment::new("b").at(GREEN_VALLEY_PARK.north(5.0)).window("11:00", "11:30"),
        TestAppointment::new("c").at(GREEN_VALLEY_PARK.north(0.1)).window("09:00", "09:30"),
        TestAppointment::new("d").at(GREEN_VALLEY_PARK.north(5.1)).window("11:00", "11:30"),
    ]);
    request.compare = true;

    let route = plan(&request);
    let comparison = route.comparison.clone().expect("comparison requested");

    assert_eq!(route.groups_count, 2);
    assert!((comparison.original_distance - 14.9).abs() < 0.01, "{comparison:?}");
    assert!(comparison.distance_saved > 0.0);
    let expected_saved = comparison.original_distance - route.total_distance;
    assert!((comparison.distance_saved - expected_saved).abs() < 1e-9);
    let expected_percent = comparison.distance_saved / comparison.original_distance * 100.0;
    assert!((comparison.improvement_percent - expected_percent).abs() < 1e-9);
    assert_pack_invariants(&route, &request);
}

#[test]
fn test_comparison_does_not_count_unserved_walks_as_savings() {
    let mut request = request(vec![
        TestAppointment::new("long-solo").solo().window("08:00", "08:10").duration(90),
        TestAppointment::new("missed").window("09:00", "09:10").in_group("late"),
        TestAppointment::new("caught").window("09:00", "12:00").in_group("late"),
    ]);
    request.compare = true;

    let route = plan(&request);
    let comparison = route.comparison.clone().expect("comparison requested");

    assert_eq!(route.unassigned[0].appointment_id, "missed");
    assert_eq!(route.total_time, 120.0);
    assert_eq!(comparison.original_time, 120.0);
    assert_eq!(comparison.time_saved, 0.0);
    assert_eq!(comparison.distance_saved, 0.0);
}

#[test]
fn test_comparison_of_single_location_is_zero_percent() {
    let mut request = request(vec![TestAppointment::new("only").solo()]);
    request.compare = true;

    let comparison = plan(&request).comparison.expect("comparison requested");

    assert_eq!(comparison.original_distance, 0.0);
    assert_eq!(comparison.improvement_percent, 0.0);
}

// ============================================================================
// Determinism and Seams
// ============================================================================

#[test]
fn test_identical_requests_produce_identical_plans() {
    let appointments: Vec<TestAppointment> = (0..7)
        .map(|i| {
            TestAppointment::new(&format!("dog{i}"))
                .at(GREEN_VALLEY_PARK.north(0.05 * i as f64))
                .window("09:00", "10:30")
                .duration(30 + 5 * (i % 3))
        })
        .collect();
    let request = request(appointments);

    let first = plan_route(&request, PlannerOptions::default());
    let second = plan_route(&request, PlannerOptions::default());

    assert_eq!(first, second);
    assert_pack_invariants(&first.route, &request);
}

/// Teleporting walker: distances are real, travel is free.
struct Teleport;

impl TravelEstimator for Teleport {
    fn distance_miles(&self, from: Coordinates, to: Coordinates) -> f64 {
        pack_planner::haversine::haversine_miles(from, to)
    }

    fn travel_seconds(&self, _from: Coordinates, _to: Coordinates) -> i32 {
        0
    }
}

#[test]
fn test_custom_estimator_drives_simulation() {
    let request = request(vec![
        TestAppointment::new("a").at(GREEN_VALLEY_PARK.coords()),
        TestAppointment::new("b").at(GREEN_VALLEY_PARK.north(0.2)),
    ]);

    let optimizer = RouteOptimizer::with_estimator(PlannerOptions::default(), Teleport);
    let outcome = optimizer.optimize(&request);

    let pickups = pickup_times(&outcome.route);
    assert_eq!(pickups["b"], hm(10, 5), "only the pickup service time separates the pickups");
}

// ============================================================================
// Request / Response Shapes
// ============================================================================

#[test]
fn test_json_round_trip() {
    let raw = r#"{
        "appointments": [
            {"id": "1",
             "pet": {"id": "p1", "name": "Mochi", "address": "1 Valle Verde Dr",
                     "lat": 36.043, "lng": -115.085},
             "start_time": "2000-01-01T10:00:00Z", "end_time": "2000-01-01T10:30:00Z",
             "duration_minutes": 30, "walk_type": "group"},
            {"id": "2", "pet": {"id": "p2", "name": "Pepper", "lat": 36.0459, "lng": -115.085},
             "start_time": "10:00", "end_time": "10:30",
             "duration_minutes": 30, "walk_type": "group"}
        ],
        "compare": true
    }"#;
    let request: PlanRequest = serde_json::from_str(raw).unwrap();

    let route = plan(&request);
    let value = serde_json::to_value(&route).unwrap();

    assert_eq!(value["optimized"], true);
    assert_eq!(value["groups_count"], 1);
    assert_eq!(value["route"][0]["stop_type"], "pickup");
    assert_eq!(value["route"][0]["start_time"], "10:00");
    assert_eq!(value["route"][0]["pet_name"], "Mochi");
    assert_eq!(value["route"][0]["walk_group_id"], "auto-1");
    assert!(value["route"][0]["coordinates"]["lat"].is_f64());
    assert_eq!(value["path_coordinates"].as_array().unwrap().len(), 4);
    assert!(value["comparison"]["improvement_percent"].is_number());
    assert!(value.get("unassigned").is_none());
}
