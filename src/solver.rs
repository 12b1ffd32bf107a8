//! Day route optimizer for a single walker.
//!
//! Planning runs in four passes over a fresh set of values:
//!
//! 1. categorize appointments into manual groups, solo walks and auto-groups,
//! 2. turn those into walk units ordered by earliest pickup,
//! 3. walk the units with a virtual clock, running the pack simulation for
//!    every group,
//! 4. aggregate stops into a `Route`.
//!
//! Nothing is kept between calls.

use crate::config::PlannerOptions;
use crate::grouping;
use crate::haversine::{total_route_distance, DistanceUnit, HaversineMatrix};
use crate::model::{
    Appointment, Comparison, Coordinates, PlanRequest, Route, Stop, StopType, UnassignedAppointment,
    UnassignedReason,
};
use crate::pack::{run_pack, PackContext, PackMember, PackState};
use crate::polyline::Polyline;
use crate::time::{TimeOfDay, TimeWindow};
use crate::trace::{PackAction, PlanTrace, TraceEvent};
use crate::traits::TravelEstimator;

const EMPTY_PLAN_MESSAGE: &str =
    "No appointments with a known location and pickup window to plan";

/// Longest walk accepted, in minutes.
pub const MAX_WALK_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrigin {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkUnitKind {
    Group(GroupOrigin),
    Solo,
}

/// The scheduling atom: one pack walk or one solo walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkUnit {
    pub kind: WalkUnitKind,
    pub label: String,
    /// Indices into the planned appointments, in input order.
    pub members: Vec<usize>,
    pub earliest_pickup: TimeOfDay,
    pub latest_pickup: TimeOfDay,
}

impl WalkUnit {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, WalkUnitKind::Group(_))
    }
}

/// A route plus the decisions that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub route: Route,
    pub trace: PlanTrace,
}

/// An appointment that passed eligibility checks.
#[derive(Debug, Clone)]
struct Planned<'a> {
    appointment: &'a Appointment,
    location: Coordinates,
    window: TimeWindow,
}

/// Plan a request with the default straight-line estimator.
pub fn plan_route(request: &PlanRequest, options: PlannerOptions) -> PlanOutcome {
    RouteOptimizer::new(options).plan(request)
}

#[derive(Debug, Clone)]
pub struct RouteOptimizer<T: TravelEstimator = HaversineMatrix> {
    options: PlannerOptions,
    estimator: T,
}

impl Default for RouteOptimizer<HaversineMatrix> {
    fn default() -> Self {
        Self::new(PlannerOptions::default())
    }
}

impl RouteOptimizer<HaversineMatrix> {
    pub fn new(options: PlannerOptions) -> Self {
        let estimator = HaversineMatrix::new(options.walking_speed_mph);
        Self { options, estimator }
    }
}

impl<T: TravelEstimator> RouteOptimizer<T> {
    pub fn with_estimator(options: PlannerOptions, estimator: T) -> Self {
        Self { options, estimator }
    }

    /// Optimize, adding the naive comparison when the request asks for it.
    pub fn plan(&self, request: &PlanRequest) -> PlanOutcome {
        if request.compare {
            self.optimize_and_compare(request)
        } else {
            self.optimize(request)
        }
    }

    pub fn optimize(&self, request: &PlanRequest) -> PlanOutcome {
        let mut trace = PlanTrace::new();
        let (planned, mut unassigned) = eligible_appointments(&request.appointments, &mut trace);

        if planned.is_empty() {
            let mut route = Route::empty(EMPTY_PLAN_MESSAGE);
            route.unassigned = unassigned;
            tracing::info!(appointments = request.appointments.len(), "nothing to plan");
            return PlanOutcome { route, trace };
        }

        let mut units = self.categorize(&planned, &mut trace);
        units.sort_by_key(|unit| unit.earliest_pickup);

        let itinerary = self.walk_units(&planned, &units, request, &mut trace);
        unassigned.extend(itinerary.unassigned);

        let route = self.aggregate(
            &planned,
            &units,
            itinerary.stops,
            unassigned,
            itinerary.warnings,
        );

        tracing::info!(
            stops = route.route.len(),
            groups = route.groups_count,
            solo = route.solo_count,
            total_distance = route.total_distance,
            total_time = route.total_time,
            "route planned"
        );

        PlanOutcome { route, trace }
    }

    /// Optimize and report savings against visiting the same served
    /// appointments in input order with no grouping.
    pub fn optimize_and_compare(&self, request: &PlanRequest) -> PlanOutcome {
        let mut outcome = self.optimize(request);
        let (original_distance, original_time) =
            self.naive_baseline(&request.appointments, &outcome.route);

        let route = &mut outcome.route;
        let distance_saved = original_distance - route.total_distance;
        let time_saved = original_time - route.total_time;
        let improvement_percent = if original_distance > 0.0 {
            distance_saved / original_distance * 100.0
        } else {
            0.0
        };

        route.comparison = Some(Comparison {
            original_distance,
            original_time,
            distance_saved,
            time_saved,
            improvement_percent,
        });

        outcome
    }

    /// Distance (miles) and time (minutes) of the input-order route over
    /// the appointments `optimized` actually serves.
    fn naive_baseline(&self, appointments: &[Appointment], optimized: &Route) -> (f64, f64) {
        let mut scratch = PlanTrace::new();
        let (planned, _) = eligible_appointments(appointments, &mut scratch);
        let served: Vec<&Planned<'_>> = planned
            .iter()
            .filter(|item| {
                optimized
                    .route
                    .iter()
                    .any(|stop| stop.appointment_id == item.appointment.id)
            })
            .collect();

        let coords: Vec<Coordinates> = served.iter().map(|p| p.location).collect();
        let distance = total_route_distance(&coords, DistanceUnit::Miles);
        let walk: i32 = served.iter().map(|p| p.appointment.duration_minutes).sum();
        (distance, self.travel_minutes_for(distance) + walk as f64)
    }

    fn travel_minutes_for(&self, miles: f64) -> f64 {
        miles / self.options.walking_speed_mph * 60.0
    }

    /// Manual groups, solo walks and auto-groups, in that order.
    fn categorize(&self, planned: &[Planned<'_>], trace: &mut PlanTrace) -> Vec<WalkUnit> {
        let mut manual: Vec<(String, Vec<usize>)> = Vec::new();
        let mut solo: Vec<usize> = Vec::new();
        let mut candidates: Vec<usize> = Vec::new();

        for (index, item) in planned.iter().enumerate() {
            let appointment = item.appointment;
            if !appointment.walk_type.is_groupable() {
                if let Some(group_id) = &appointment.manual_group_id {
                    trace.record(TraceEvent::SoloOverride {
                        appointment_id: appointment.id.clone(),
                        manual_group_id: group_id.clone(),
                    });
                }
                solo.push(index);
                continue;
            }

            match &appointment.manual_group_id {
                Some(group_id) => match manual.iter_mut().find(|(id, _)| id == group_id) {
                    Some((_, members)) => members.push(index),
                    None => manual.push((group_id.clone(), vec![index])),
                },
                None => candidates.push(index),
            }
        }

        let mut units = Vec::new();
        for (group_id, members) in manual {
            let kind = WalkUnitKind::Group(GroupOrigin::Manual);
            units.push(build_unit(planned, kind, group_id, members));
        }
        for index in solo {
            let label = format!("solo-{}", planned[index].appointment.id);
            units.push(build_unit(planned, WalkUnitKind::Solo, label, vec![index]));
        }
        let auto = self.auto_groups(planned, &candidates, trace);
        for (n, members) in auto.into_iter().enumerate() {
            let label = format!("auto-{}", n + 1);
            let kind = WalkUnitKind::Group(GroupOrigin::Auto);
            units.push(build_unit(planned, kind, label, members));
        }

        units
    }

    /// Cluster ungrouped candidates; any fault degrades to one group each.
    fn auto_groups(
        &self,
        planned: &[Planned<'_>],
        candidates: &[usize],
        trace: &mut PlanTrace,
    ) -> Vec<Vec<usize>> {
        let appointments: Vec<&Appointment> = candidates
            .iter()
            .map(|&i| planned[i].appointment)
            .collect();

        match grouping::cluster(&appointments, &self.options.grouping) {
            Ok(groups) => groups
                .into_iter()
                .map(|group| group.into_iter().map(|i| candidates[i]).collect())
                .collect(),
            Err(error) => {
                trace.record(TraceEvent::AutoGroupingFallback {
                    error: error.to_string(),
                });
                candidates.iter().map(|&index| vec![index]).collect()
            }
        }
    }

    fn seed_clock(
        &self,
        units: &[WalkUnit],
        current_time: Option<TimeOfDay>,
        trace: &mut PlanTrace,
    ) -> TimeOfDay {
        let earliest = units.iter().map(|u| u.earliest_pickup).min().unwrap_or_default();
        let latest = units.iter().map(|u| u.latest_pickup).max().unwrap_or_default();

        let (at, from_current_time) = match current_time {
            Some(now) if earliest <= now && now <= latest => (now, true),
            _ => (earliest, false),
        };
        trace.record(TraceEvent::ClockSeeded { at, from_current_time });
        at
    }

    fn walk_units(
        &self,
        planned: &[Planned<'_>],
        units: &[WalkUnit],
        request: &PlanRequest,
        trace: &mut PlanTrace,
    ) -> Itinerary {
        let mut itinerary = Itinerary::default();
        let mut clock = self.seed_clock(units, request.current_time, trace);
        let mut location = request
            .start_location
            .filter(Coordinates::is_valid)
            .or_else(|| units.first().map(|unit| planned[unit.members[0]].location));

        for unit in units {
            let first = planned[unit.members[0]].location;
            let travel = location
                .map(|from| self.estimator.travel_seconds(from, first))
                .unwrap_or(0);
            let arrival = (clock + travel).max(unit.earliest_pickup);

            trace.record(TraceEvent::UnitArrival {
                unit: unit.label.clone(),
                at: arrival,
                earliest_pickup: unit.earliest_pickup,
                latest_pickup: unit.latest_pickup,
            });
            if arrival > unit.latest_pickup {
                trace.record(TraceEvent::SchedulingConflict {
                    unit: unit.label.clone(),
                    arrival,
                    latest_pickup: unit.latest_pickup,
                });
                itinerary.warnings.push(format!(
                    "walk unit {} reached at {}, after its latest pickup {}",
                    unit.label, arrival, unit.latest_pickup
                ));
            }

            match unit.kind {
                WalkUnitKind::Solo => {
                    let item = &planned[unit.members[0]];
                    let end = arrival.add_minutes(item.appointment.duration_minutes);
                    itinerary.push(item, StopType::Solo, arrival, end, None, false);
                    clock = end;
                    location = Some(item.location);
                }
                WalkUnitKind::Group(_) => {
                    let (end, end_location) =
                        self.walk_pack(planned, unit, arrival, first, &mut itinerary, trace);
                    clock = end;
                    location = Some(end_location);
                }
            }
        }

        itinerary
    }

    /// Run the pack simulation for one group; returns where and when it ends.
    fn walk_pack(
        &self,
        planned: &[Planned<'_>],
        unit: &WalkUnit,
        start: TimeOfDay,
        start_location: Coordinates,
        itinerary: &mut Itinerary,
        trace: &mut PlanTrace,
    ) -> (TimeOfDay, Coordinates) {
        let members: Vec<PackMember> = unit
            .members
            .iter()
            .map(|&index| {
                let item = &planned[index];
                PackMember {
                    source: index,
                    appointment_id: item.appointment.id.clone(),
                    location: item.location,
                    window: item.window,
                    duration_minutes: item.appointment.duration_minutes,
                }
            })
            .collect();

        let ctx = PackContext {
            members: &members,
            estimator: &self.estimator,
            limits: &self.options.pack,
            weights: &self.options.weights,
        };
        let initial = PackState::start(members.len(), start, start_location);
        let run = run_pack(&ctx, initial, &unit.label, trace);

        for stop in &run.stops {
            let item = &planned[members[stop.member].source];
            let (stop_type, overdue) = match stop.action {
                PackAction::Pickup => (StopType::Pickup, false),
                PackAction::Dropoff => (StopType::Dropoff, false),
                PackAction::OverdueDropoff => (StopType::Dropoff, true),
            };
            let group = Some(unit.label.as_str());
            itinerary.push(item, stop_type, stop.arrival, stop.departure, group, overdue);
        }

        for &member in &run.unreachable {
            itinerary.unassigned.push(UnassignedAppointment {
                appointment_id: members[member].appointment_id.clone(),
                reason: UnassignedReason::WindowUnreachable,
            });
        }

        (run.final_state.now, run.final_state.location)
    }

    fn aggregate(
        &self,
        planned: &[Planned<'_>],
        units: &[WalkUnit],
        stops: Vec<Stop>,
        unassigned: Vec<UnassignedAppointment>,
        warnings: Vec<String>,
    ) -> Route {
        let path = Polyline::new(stops.iter().map(|stop| stop.coordinates).collect());
        let total_distance = path.length_miles();
        let total_travel_time = self.travel_minutes_for(total_distance);

        // Each served appointment counts once, however many stops it has.
        let total_walk_time: i32 = planned
            .iter()
            .filter(|item| {
                stops
                    .iter()
                    .any(|stop| stop.appointment_id == item.appointment.id)
            })
            .map(|item| item.appointment.duration_minutes)
            .sum();

        Route {
            route: stops,
            total_distance,
            total_travel_time,
            total_walk_time,
            total_time: total_travel_time + total_walk_time as f64,
            path_coordinates: path.into_points(),
            optimized: true,
            groups_count: units.iter().filter(|unit| unit.is_group()).count(),
            solo_count: units.iter().filter(|unit| !unit.is_group()).count(),
            unassigned,
            warnings,
            message: None,
            comparison: None,
        }
    }
}

#[derive(Debug, Default)]
struct Itinerary {
    stops: Vec<Stop>,
    unassigned: Vec<UnassignedAppointment>,
    warnings: Vec<String>,
}

impl Itinerary {
    fn push(
        &mut self,
        item: &Planned<'_>,
        stop_type: StopType,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        walk_group_id: Option<&str>,
        overdue: bool,
    ) {
        let sequence = self.stops.len() + 1;
        let appointment = item.appointment;
        self.stops.push(Stop {
            id: format!("stop-{sequence}"),
            sequence,
            appointment_id: appointment.id.clone(),
            pet_id: appointment.pet.id.clone(),
            pet_name: appointment.pet.name.clone(),
            address: appointment.pet.address.clone(),
            start_time,
            end_time,
            duration: appointment.duration_minutes,
            walk_type: appointment.walk_type,
            walk_group_id: walk_group_id.map(str::to_string),
            stop_type,
            coordinates: item.location,
            overdue,
        });
    }
}

/// Split appointments into plannable ones and exclusions.
///
/// Durations outside `1..=MAX_WALK_MINUTES` are excluded here so a bad walk
/// length never reaches grouping or the clock.
fn eligible_appointments<'a>(
    appointments: &'a [Appointment],
    trace: &mut PlanTrace,
) -> (Vec<Planned<'a>>, Vec<UnassignedAppointment>) {
    let mut planned = Vec::new();
    let mut unassigned = Vec::new();

    for appointment in appointments {
        let duration_ok = (1..=MAX_WALK_MINUTES).contains(&appointment.duration_minutes);
        let resolved = match (appointment.location(), appointment.pickup_window()) {
            (None, _) => Err(UnassignedReason::MissingLocation),
            (_, None) => Err(UnassignedReason::InvalidWindow),
            _ if !duration_ok => Err(UnassignedReason::InvalidDuration),
            (Some(location), Some(window)) => Ok(Planned {
                appointment,
                location,
                window,
            }),
        };

        match resolved {
            Ok(item) => planned.push(item),
            Err(reason) => {
                trace.record(TraceEvent::Excluded {
                    appointment_id: appointment.id.clone(),
                    reason,
                });
                unassigned.push(UnassignedAppointment {
                    appointment_id: appointment.id.clone(),
                    reason,
                });
            }
        }
    }

    (planned, unassigned)
}

fn build_unit(
    planned: &[Planned<'_>],
    kind: WalkUnitKind,
    label: String,
    members: Vec<usize>,
) -> WalkUnit {
    let earliest_pickup = members
        .iter()
        .map(|&i| planned[i].window.start)
        .min()
        .unwrap_or_default();
    let latest_pickup = members
        .iter()
        .map(|&i| planned[i].window.end)
        .max()
        .unwrap_or_default();

    WalkUnit {
        kind,
        label,
        members,
        earliest_pickup,
        latest_pickup,
    }
}
