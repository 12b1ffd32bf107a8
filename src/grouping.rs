//! Pack-walk grouping by proximity, time and walk type.
//!
//! `suggest_groups` produces advisory suggestions for a day's ungrouped
//! appointments. `cluster` is the same compatibility pass, used by the route
//! optimizer to form auto-groups.

use serde::Serialize;

use crate::config::GroupingOptions;
use crate::error::GroupingError;
use crate::haversine::{
    haversine_miles, total_route_distance, DistanceUnit, DEFAULT_WALKING_SPEED_MPH,
};
use crate::model::{Appointment, Coordinates};
use crate::time::TimeOfDay;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PetSummary {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSuggestion {
    pub appointment_ids: Vec<String>,
    pub pets: Vec<PetSummary>,
    /// Miles between consecutive members, in input order.
    pub total_distance: f64,
    /// Minutes.
    pub estimated_combined_time: f64,
    /// Minutes the walks take when booked one after another.
    pub individual_time: f64,
    pub estimated_savings: f64,
}

/// An appointment with everything grouping needs resolved up front.
#[derive(Debug, Clone, Copy)]
struct Groupable {
    location: Coordinates,
    walk_start: TimeOfDay,
    walk_end: TimeOfDay,
    groupable_type: bool,
}

impl Groupable {
    fn resolve(appointment: &Appointment) -> Result<Self, GroupingError> {
        let location = appointment
            .location()
            .ok_or_else(|| GroupingError::MissingLocation {
                appointment_id: appointment.id.clone(),
            })?;
        let window = appointment
            .pickup_window()
            .ok_or_else(|| GroupingError::MissingWindow {
                appointment_id: appointment.id.clone(),
            })?;
        if appointment.duration_minutes <= 0 {
            return Err(GroupingError::InvalidDuration {
                appointment_id: appointment.id.clone(),
                duration_minutes: appointment.duration_minutes,
            });
        }

        Ok(Self {
            location,
            walk_start: window.start,
            walk_end: window.start.add_minutes(appointment.duration_minutes),
            groupable_type: appointment.walk_type.is_groupable(),
        })
    }

    fn windows_overlap(&self, other: &Groupable, buffer_minutes: i32) -> bool {
        self.walk_start <= other.walk_end.add_minutes(buffer_minutes)
            && other.walk_start <= self.walk_end.add_minutes(buffer_minutes)
    }
}

/// Whether `candidate` may join a group already holding `members`.
///
/// Needs a groupable walk type on both sides, a member within
/// `max_distance_miles`, and walk windows overlapping every member's.
fn fits_group(members: &[Groupable], candidate: &Groupable, options: &GroupingOptions) -> bool {
    if !candidate.groupable_type || members.iter().any(|member| !member.groupable_type) {
        return false;
    }

    let near_someone = members.iter().any(|member| {
        haversine_miles(member.location, candidate.location) <= options.max_distance_miles
    });
    if !near_someone {
        return false;
    }

    members
        .iter()
        .all(|member| member.windows_overlap(candidate, options.time_buffer_minutes))
}

/// Greedy single-pass clustering.
///
/// Returns groups as indices into `appointments`, each group in input order
/// and groups ordered by their seed. Every appointment lands in exactly one
/// group; solo/training appointments always end up alone.
pub fn cluster(
    appointments: &[&Appointment],
    options: &GroupingOptions,
) -> Result<Vec<Vec<usize>>, GroupingError> {
    let resolved = appointments
        .iter()
        .map(|appointment| Groupable::resolve(appointment))
        .collect::<Result<Vec<_>, _>>()?;

    let max_size = options.max_group_size.max(1);
    let mut processed = vec![false; resolved.len()];
    let mut groups = Vec::new();

    for seed in 0..resolved.len() {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;

        let mut group = vec![seed];
        let mut members = vec![resolved[seed]];

        for candidate in seed + 1..resolved.len() {
            if group.len() >= max_size {
                break;
            }
            if processed[candidate] {
                continue;
            }
            if fits_group(&members, &resolved[candidate], options) {
                processed[candidate] = true;
                group.push(candidate);
                members.push(resolved[candidate]);
            }
        }

        groups.push(group);
    }

    Ok(groups)
}

/// Suggest pack walks for a set of ungrouped appointments.
///
/// Appointments without coordinates, without a parsable start time, or with
/// a solo/training walk type are left out. Single-appointment groups are
/// still reported. Suggestions come back sorted by `estimated_savings`,
/// highest first.
pub fn suggest_groups(
    appointments: &[Appointment],
    options: &GroupingOptions,
) -> Vec<GroupSuggestion> {
    let eligible: Vec<&Appointment> = appointments
        .iter()
        .filter(|appointment| appointment.walk_type.is_groupable())
        .filter(|appointment| Groupable::resolve(appointment).is_ok())
        .collect();

    let groups = match cluster(&eligible, options) {
        Ok(groups) => groups,
        Err(error) => {
            tracing::warn!(%error, "grouping suggestions unavailable");
            return Vec::new();
        }
    };

    let mut suggestions: Vec<GroupSuggestion> = groups
        .iter()
        .map(|group| {
            let members: Vec<&Appointment> = group.iter().map(|&i| eligible[i]).collect();
            summarize(&members)
        })
        .collect();

    suggestions.sort_by(|a, b| b.estimated_savings.total_cmp(&a.estimated_savings));

    tracing::debug!(
        candidates = eligible.len(),
        suggestions = suggestions.len(),
        "grouping suggestions computed"
    );

    suggestions
}

fn summarize(members: &[&Appointment]) -> GroupSuggestion {
    let coords: Vec<Coordinates> = members.iter().filter_map(|a| a.location()).collect();
    let total_distance = total_route_distance(&coords, DistanceUnit::Miles);
    let travel_minutes = total_distance / DEFAULT_WALKING_SPEED_MPH * 60.0;
    let individual_time: f64 = members.iter().map(|a| a.duration_minutes as f64).sum();
    let estimated_combined_time = individual_time + travel_minutes;

    GroupSuggestion {
        appointment_ids: members.iter().map(|a| a.id.clone()).collect(),
        pets: members
            .iter()
            .map(|a| PetSummary {
                id: a.pet.id.clone(),
                name: a.pet.name.clone(),
                address: a.pet.address.clone(),
            })
            .collect(),
        total_distance,
        estimated_combined_time,
        individual_time,
        estimated_savings: individual_time - estimated_combined_time,
    }
}
