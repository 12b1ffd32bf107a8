//! Route geometry.
//!
//! The planner reports its path as the ordered stop coordinates; distance
//! totals are measured along this line.

use serde::{Deserialize, Serialize};

use crate::haversine::{total_route_distance, DistanceUnit};
use crate::model::Coordinates;

/// The walker's path as an ordered list of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinates>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinates>) -> Self {
        Self { points }
    }

    pub fn into_points(self) -> Vec<Coordinates> {
        self.points
    }

    /// Haversine length along consecutive points.
    pub fn length_miles(&self) -> f64 {
        total_route_distance(&self.points, DistanceUnit::Miles)
    }
}
