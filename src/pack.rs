//! Greedy pack-walk simulation.
//!
//! A pack walk is driven by `step`, a pure transition from one `PackState`
//! to the next. Each step does exactly one of:
//!
//! - drops off the most overdue dog (no cost comparison),
//! - executes the cheapest valid pickup or drop-off,
//! - advances the clock to the next moment something becomes possible,
//! - reports that the pack is finished or stalled.
//!
//! Costs are in minutes; lower is better. Ties go to the first candidate
//! enumerated: drop-offs in pickup order, then pickups nearest first.

use crate::config::{CostWeights, PackLimits};
use crate::model::Coordinates;
use crate::time::{TimeOfDay, TimeWindow};
use crate::trace::{PackAction, PlanTrace, TraceEvent};
use crate::traits::TravelEstimator;

/// A dog taking part in one pack walk.
#[derive(Debug, Clone, PartialEq)]
pub struct PackMember {
    /// Caller's index for mapping results back to appointments.
    pub source: usize,
    pub appointment_id: String,
    pub location: Coordinates,
    pub window: TimeWindow,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkingDog {
    /// Index into the pack's member list.
    pub member: usize,
    /// Walk timer anchor.
    pub picked_up_at: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackState {
    pub now: TimeOfDay,
    pub location: Coordinates,
    /// Members not yet picked up, in member order.
    pub waiting: Vec<usize>,
    /// Members currently being walked, in pickup order.
    pub walking: Vec<WalkingDog>,
}

impl PackState {
    /// Everyone waiting, nobody walking.
    pub fn start(member_count: usize, now: TimeOfDay, location: Coordinates) -> Self {
        Self {
            now,
            location,
            waiting: (0..member_count).collect(),
            walking: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.waiting.is_empty() && self.walking.is_empty()
    }

    pub fn pack_size(&self) -> usize {
        self.walking.len()
    }

    fn walking_dog(&self, member: usize) -> Option<&WalkingDog> {
        self.walking.iter().find(|dog| dog.member == member)
    }
}

/// Everything a step needs besides the state itself.
pub struct PackContext<'a, T: TravelEstimator> {
    pub members: &'a [PackMember],
    pub estimator: &'a T,
    pub limits: &'a PackLimits,
    pub weights: &'a CostWeights,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Pickup {
        member: usize,
        arrival: TimeOfDay,
        cost: f64,
    },
    Dropoff {
        member: usize,
        arrival: TimeOfDay,
        picked_up_at: TimeOfDay,
        /// `None` for an overdue drop-off.
        cost: Option<f64>,
    },
    Advance {
        from: TimeOfDay,
        to: TimeOfDay,
    },
    /// Dogs are still waiting but none can ever be picked up.
    Stalled,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Candidate {
    Pickup { member: usize, arrival: TimeOfDay },
    Dropoff { member: usize, arrival: TimeOfDay },
}

impl<'a, T: TravelEstimator> PackContext<'a, T> {
    fn member(&self, index: usize) -> &PackMember {
        &self.members[index]
    }

    fn tolerance_secs(&self) -> i32 {
        self.limits.tolerance_minutes.saturating_mul(60)
    }

    fn target_secs(&self, member: usize) -> i32 {
        self.member(member).duration_minutes.saturating_mul(60)
    }

    /// Longest acceptable walk for `member`, in seconds.
    fn limit_secs(&self, member: usize) -> i32 {
        self.target_secs(member).saturating_add(self.tolerance_secs())
    }

    fn travel_secs(&self, from: Coordinates, member: usize) -> i32 {
        self.estimator.travel_seconds(from, self.member(member).location)
    }

    /// Walked dog whose elapsed time is past target + tolerance, furthest
    /// over first.
    fn most_overdue(&self, state: &PackState) -> Option<WalkingDog> {
        let mut worst: Option<(WalkingDog, i32)> = None;
        for dog in &state.walking {
            let elapsed = state.now - dog.picked_up_at;
            let over = elapsed.saturating_sub(self.limit_secs(dog.member));
            if over <= 0 {
                continue;
            }
            match worst {
                Some((_, worst_over)) if worst_over >= over => {}
                _ => worst = Some((*dog, over)),
            }
        }
        worst.map(|(dog, _)| dog)
    }

    fn dropoff_candidates(&self, state: &PackState) -> Vec<Candidate> {
        state
            .walking
            .iter()
            .filter_map(|dog| {
                let arrival = state.now + self.travel_secs(state.location, dog.member);
                let elapsed = arrival - dog.picked_up_at;
                let target = self.target_secs(dog.member);
                let earliest = target.saturating_sub(self.tolerance_secs());
                let droppable = elapsed >= earliest && elapsed <= self.limit_secs(dog.member);
                droppable.then_some(Candidate::Dropoff {
                    member: dog.member,
                    arrival,
                })
            })
            .collect()
    }

    fn pickup_candidates(&self, state: &PackState) -> Vec<Candidate> {
        if state.pack_size() >= self.limits.capacity {
            return Vec::new();
        }

        let mut open: Vec<(usize, f64, TimeOfDay)> = state
            .waiting
            .iter()
            .filter_map(|&member| {
                let window = self.member(member).window;
                if !window.contains(state.now) {
                    return None;
                }
                let arrival = state.now + self.travel_secs(state.location, member);
                if arrival > window.end {
                    return None;
                }
                let distance = self
                    .estimator
                    .distance_miles(state.location, self.member(member).location);
                Some((member, distance, arrival))
            })
            .collect();

        // Stable: equal distances keep member order.
        open.sort_by(|a, b| a.1.total_cmp(&b.1));
        open.truncate(self.limits.pickup_candidate_limit);

        open.into_iter()
            .map(|(member, _, arrival)| Candidate::Pickup { member, arrival })
            .collect()
    }

    /// Travel + duration deviation − pack relief − chaining.
    fn dropoff_cost(&self, state: &PackState, member: usize, arrival: TimeOfDay) -> f64 {
        let Some(dog) = state.walking_dog(member) else {
            return f64::INFINITY;
        };
        let travel = arrival.minutes_since(state.now);
        let elapsed = arrival.minutes_since(dog.picked_up_at);
        let target = self.member(member).duration_minutes as f64;

        let mut cost = travel + self.weights.duration_deviation * (elapsed - target).abs();

        if state.pack_size() >= self.limits.capacity {
            cost -= self.weights.pack_relief_bonus;
        }

        let drop_location = self.member(member).location;
        let nearby_open = state
            .waiting
            .iter()
            .filter(|&&waiting| {
                let candidate = self.member(waiting);
                candidate.window.end >= state.now
                    && self.estimator.distance_miles(drop_location, candidate.location)
                        <= self.limits.chaining_radius_miles
            })
            .count();
        cost -= self.weights.chaining_bonus * nearby_open as f64;

        cost
    }

    /// Travel − urgency + overdue risk + duration mismatch with the pack.
    fn pickup_cost(&self, state: &PackState, member: usize, arrival: TimeOfDay) -> f64 {
        let candidate = self.member(member);
        let travel = arrival.minutes_since(state.now);
        let mut cost = travel;

        let until_close = candidate.window.end.minutes_since(state.now);
        if until_close < self.limits.urgency_horizon_minutes {
            cost -= self.limits.urgency_horizon_minutes - until_close;
        }

        // Where the walked dogs will stand once this pickup is done.
        let ready_at = arrival.add_minutes(self.limits.pickup_service_minutes);
        let tolerance = self.limits.tolerance_minutes as f64;
        let mut risk = 0.0_f64;
        for dog in &state.walking {
            let limit = self.member(dog.member).duration_minutes as f64 + tolerance;
            let projected = ready_at.minutes_since(dog.picked_up_at);
            if projected > limit {
                risk = risk.max(self.weights.overdue_penalty);
            } else if projected > limit - tolerance {
                risk = risk.max(self.weights.near_overdue_penalty);
            }
        }
        cost += risk;

        if !state.walking.is_empty() {
            let remaining: f64 = state
                .walking
                .iter()
                .map(|dog| {
                    let target = self.member(dog.member).duration_minutes as f64;
                    target - state.now.minutes_since(dog.picked_up_at)
                })
                .sum::<f64>()
                / state.walking.len() as f64;
            let mismatch = (candidate.duration_minutes as f64 - remaining).abs();
            cost += self.weights.duration_compatibility * mismatch;
        }

        cost
    }

    fn cost(&self, state: &PackState, candidate: Candidate) -> f64 {
        match candidate {
            Candidate::Pickup { member, arrival } => self.pickup_cost(state, member, arrival),
            Candidate::Dropoff { member, arrival } => self.dropoff_cost(state, member, arrival),
        }
    }

    /// Earliest future instant at which a window opens, a walked dog becomes
    /// droppable on arrival, or a walked dog becomes overdue.
    fn next_event(&self, state: &PackState) -> Option<TimeOfDay> {
        let openings = state
            .waiting
            .iter()
            .map(|&member| self.member(member).window.start);

        let walked = state.walking.iter().flat_map(|dog| {
            let target = self.target_secs(dog.member);
            let travel = self.travel_secs(state.location, dog.member);
            let lead = target
                .saturating_sub(self.tolerance_secs())
                .saturating_sub(travel);
            let droppable_at = dog.picked_up_at + lead;
            let overdue_at = dog.picked_up_at + self.limit_secs(dog.member).saturating_add(1);
            [droppable_at, overdue_at]
        });

        openings.chain(walked).filter(|&at| at > state.now).min()
    }
}

fn pickup(
    mut state: PackState,
    member: usize,
    arrival: TimeOfDay,
    location: Coordinates,
    service_minutes: i32,
) -> PackState {
    state.waiting.retain(|&waiting| waiting != member);
    state.walking.push(WalkingDog {
        member,
        picked_up_at: arrival,
    });
    state.location = location;
    state.now = arrival.add_minutes(service_minutes);
    state
}

fn dropoff(
    mut state: PackState,
    member: usize,
    arrival: TimeOfDay,
    location: Coordinates,
    service_minutes: i32,
) -> PackState {
    state.walking.retain(|dog| dog.member != member);
    state.location = location;
    state.now = arrival.add_minutes(service_minutes);
    state
}

/// Advance the pack by one transition.
pub fn step<T: TravelEstimator>(
    state: PackState,
    ctx: &PackContext<'_, T>,
) -> (PackState, Transition) {
    if state.is_finished() {
        return (state, Transition::Finished);
    }

    if let Some(dog) = ctx.most_overdue(&state) {
        let arrival = state.now + ctx.travel_secs(state.location, dog.member);
        let location = ctx.member(dog.member).location;
        let service = ctx.limits.dropoff_service_minutes;
        let next = dropoff(state, dog.member, arrival, location, service);
        return (
            next,
            Transition::Dropoff {
                member: dog.member,
                arrival,
                picked_up_at: dog.picked_up_at,
                cost: None,
            },
        );
    }

    let mut best: Option<(Candidate, f64)> = None;
    for candidate in ctx
        .dropoff_candidates(&state)
        .into_iter()
        .chain(ctx.pickup_candidates(&state))
    {
        let cost = ctx.cost(&state, candidate);
        match best {
            Some((_, best_cost)) if best_cost <= cost => {}
            _ => best = Some((candidate, cost)),
        }
    }

    match best {
        Some((Candidate::Pickup { member, arrival }, cost)) => {
            let location = ctx.member(member).location;
            let next = pickup(state, member, arrival, location, ctx.limits.pickup_service_minutes);
            (next, Transition::Pickup { member, arrival, cost })
        }
        Some((Candidate::Dropoff { member, arrival }, cost)) => {
            let picked_up_at = state
                .walking_dog(member)
                .map(|dog| dog.picked_up_at)
                .unwrap_or(arrival);
            let location = ctx.member(member).location;
            let service = ctx.limits.dropoff_service_minutes;
            let next = dropoff(state, member, arrival, location, service);
            (
                next,
                Transition::Dropoff {
                    member,
                    arrival,
                    picked_up_at,
                    cost: Some(cost),
                },
            )
        }
        None => match ctx.next_event(&state) {
            Some(to) => {
                let from = state.now;
                let mut next = state;
                next.now = to;
                (next, Transition::Advance { from, to })
            }
            None => (state, Transition::Stalled),
        },
    }
}

/// A pickup or drop-off produced by a pack run.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStop {
    pub member: usize,
    pub action: PackAction,
    pub arrival: TimeOfDay,
    pub departure: TimeOfDay,
    pub location: Coordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackRun {
    pub stops: Vec<PackStop>,
    /// Members that were never picked up.
    pub unreachable: Vec<usize>,
    pub final_state: PackState,
}

/// Drive `step` until the pack is finished or stalled.
pub fn run_pack<T: TravelEstimator>(
    ctx: &PackContext<'_, T>,
    initial: PackState,
    unit: &str,
    trace: &mut PlanTrace,
) -> PackRun {
    let mut state = initial;
    let mut stops = Vec::new();

    loop {
        let (next, transition) = step(state, ctx);
        state = next;

        match transition {
            Transition::Pickup { member, arrival, cost } => {
                trace.record(TraceEvent::Decision {
                    unit: unit.to_string(),
                    action: PackAction::Pickup,
                    appointment_id: ctx.member(member).appointment_id.clone(),
                    cost: Some(cost),
                    at: arrival,
                    pack_size: state.pack_size(),
                });
                stops.push(PackStop {
                    member,
                    action: PackAction::Pickup,
                    arrival,
                    departure: state.now,
                    location: state.location,
                });
            }
            Transition::Dropoff { member, arrival, cost, .. } => {
                let action = if cost.is_some() {
                    PackAction::Dropoff
                } else {
                    PackAction::OverdueDropoff
                };
                trace.record(TraceEvent::Decision {
                    unit: unit.to_string(),
                    action,
                    appointment_id: ctx.member(member).appointment_id.clone(),
                    cost,
                    at: arrival,
                    pack_size: state.pack_size(),
                });
                stops.push(PackStop {
                    member,
                    action,
                    arrival,
                    departure: state.now,
                    location: state.location,
                });
            }
            Transition::Advance { from, to } => {
                trace.record(TraceEvent::ClockAdvanced {
                    unit: unit.to_string(),
                    from,
                    to,
                });
            }
            Transition::Stalled => {
                trace.record(TraceEvent::Unreachable {
                    unit: unit.to_string(),
                    appointment_ids: state
                        .waiting
                        .iter()
                        .map(|&member| ctx.member(member).appointment_id.clone())
                        .collect(),
                });
                break;
            }
            Transition::Finished => break,
        }
    }

    PackRun {
        unreachable: state.waiting.clone(),
        stops,
        final_state: state,
    }
}
