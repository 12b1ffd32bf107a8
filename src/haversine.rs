//! Great-circle distance helpers and the straight-line travel estimator.
//!
//! Everything here is pure: no I/O and no state, so results only depend on
//! the floating-point inputs.

use rayon::prelude::*;

use crate::model::Coordinates;
use crate::traits::TravelEstimator;

/// Earth radius in miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Walking pace assumed by the planner.
pub const DEFAULT_WALKING_SPEED_MPH: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

/// How the walker gets between stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TravelMode {
    #[default]
    Walking,
    Biking,
    Driving,
    Transit,
}

impl TravelMode {
    pub fn speed_mph(self) -> f64 {
        match self {
            TravelMode::Walking => 3.0,
            TravelMode::Biking => 12.0,
            TravelMode::Driving => 25.0,
            TravelMode::Transit => 15.0,
        }
    }

    /// Fixed per-leg overhead (parking, locking a bike, waiting for a bus).
    pub fn buffer_minutes(self) -> i32 {
        match self {
            TravelMode::Walking => 1,
            TravelMode::Biking => 2,
            TravelMode::Driving => 5,
            TravelMode::Transit => 3,
        }
    }
}

/// Haversine distance between two points.
fn haversine(from: Coordinates, to: Coordinates, unit: DistanceUnit) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    unit.earth_radius() * c
}

/// Haversine distance in miles between two known points.
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    haversine(from, to, DistanceUnit::Miles)
}

/// Great-circle distance, or `None` when any coordinate is missing.
pub fn distance_between(
    lat1: Option<f64>,
    lng1: Option<f64>,
    lat2: Option<f64>,
    lng2: Option<f64>,
    unit: DistanceUnit,
) -> Option<f64> {
    let from = Coordinates::new(lat1?, lng1?);
    let to = Coordinates::new(lat2?, lng2?);
    Some(haversine(from, to, unit))
}

/// Estimated travel time in minutes for a single leg, including the mode's
/// fixed buffer. `None` when any coordinate is missing.
pub fn estimated_travel_time(
    lat1: Option<f64>,
    lng1: Option<f64>,
    lat2: Option<f64>,
    lng2: Option<f64>,
    mode: TravelMode,
) -> Option<i32> {
    let miles = distance_between(lat1, lng1, lat2, lng2, DistanceUnit::Miles)?;
    Some(leg_minutes(miles, mode))
}

fn leg_minutes(miles: f64, mode: TravelMode) -> i32 {
    (miles / mode.speed_mph() * 60.0).round() as i32 + mode.buffer_minutes()
}

/// Pairwise distance matrix. Rows are filled in parallel; the diagonal is zero.
pub fn distance_matrix(coords: &[Coordinates], unit: DistanceUnit) -> Vec<Vec<f64>> {
    coords
        .par_iter()
        .enumerate()
        .map(|(i, from)| {
            coords
                .iter()
                .enumerate()
                .map(|(j, to)| if i == j { 0.0 } else { haversine(*from, *to, unit) })
                .collect()
        })
        .collect()
}

/// Sum of consecutive leg distances.
pub fn total_route_distance(coords: &[Coordinates], unit: DistanceUnit) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine(pair[0], pair[1], unit))
        .sum()
}

/// Sum of consecutive leg travel times in minutes, each leg with its buffer.
pub fn total_route_time(coords: &[Coordinates], mode: TravelMode) -> i32 {
    coords
        .windows(2)
        .map(|pair| leg_minutes(haversine_miles(pair[0], pair[1]), mode))
        .sum()
}

/// Indices (in input order) and distances of the locations within `radius`.
pub fn locations_within_radius(
    center: Coordinates,
    locations: &[Coordinates],
    radius: f64,
    unit: DistanceUnit,
) -> Vec<(usize, f64)> {
    locations
        .iter()
        .enumerate()
        .filter_map(|(index, location)| {
            let distance = haversine(center, *location, unit);
            (distance <= radius).then_some((index, distance))
        })
        .collect()
}

/// Arithmetic centroid; fine at neighbourhood scale.
pub fn calculate_center(coords: &[Coordinates]) -> Option<Coordinates> {
    if coords.is_empty() {
        return None;
    }
    let n = coords.len() as f64;
    let lat = coords.iter().map(|c| c.lat).sum::<f64>() / n;
    let lng = coords.iter().map(|c| c.lng).sum::<f64>() / n;
    Some(Coordinates::new(lat, lng))
}

/// Straight-line travel estimator at a constant speed.
///
/// This is what the planner uses by default; legs carry no fixed buffer so
/// that a zero-distance hop costs zero time inside a pack walk.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average speed in mph.
    pub speed_mph: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_mph: DEFAULT_WALKING_SPEED_MPH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_mph: f64) -> Self {
        Self { speed_mph }
    }

    /// Convert a distance in miles to travel time in seconds.
    pub fn miles_to_seconds(&self, miles: f64) -> i32 {
        let hours = miles / self.speed_mph;
        (hours * 3600.0).round() as i32
    }
}

impl TravelEstimator for HaversineMatrix {
    fn distance_miles(&self, from: Coordinates, to: Coordinates) -> f64 {
        haversine_miles(from, to)
    }

    fn travel_seconds(&self, from: Coordinates, to: Coordinates) -> i32 {
        self.miles_to_seconds(haversine_miles(from, to))
    }
}
