//! Seams between the planner and its collaborators.
//!
//! The planner only needs straight-line estimates, but callers (and tests)
//! can swap in their own travel model.

use crate::model::Coordinates;

/// Estimates distance and travel time between two points.
///
/// Implementations must be deterministic. The pack simulation breaks cost
/// ties by enumeration order.
pub trait TravelEstimator: Send + Sync {
    /// Distance in miles.
    fn distance_miles(&self, from: Coordinates, to: Coordinates) -> f64;

    /// Travel time in whole seconds.
    fn travel_seconds(&self, from: Coordinates, to: Coordinates) -> i32;
}
