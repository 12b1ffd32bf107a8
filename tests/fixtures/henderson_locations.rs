//! Henderson, NV locations for realistic test fixtures.
//!
//! Residential spots a single walker could plausibly cover in a day, plus
//! helpers to place points a known distance apart.

use pack_planner::model::Coordinates;

/// Degrees of latitude per mile.
pub const DEGREES_PER_MILE: f64 = 1.0 / 69.094;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// A point `miles` due north (negative for south).
    pub fn north(&self, miles: f64) -> Coordinates {
        Coordinates::new(self.lat + miles * DEGREES_PER_MILE, self.lng)
    }
}

pub const GREEN_VALLEY_PARK: Location = Location::new("Green Valley Park", 36.0430, -115.0850);
pub const ANTHEM_HILLS_PARK: Location = Location::new("Anthem Hills Park", 35.9802, -115.1005);
pub const CORNERSTONE_PARK: Location = Location::new("Cornerstone Park", 36.0371, -114.9997);
pub const WHITNEY_RANCH: Location = Location::new("Whitney Ranch", 36.0580, -115.0617);
pub const SEVEN_HILLS: Location = Location::new("Seven Hills", 35.9961, -115.1230);

pub const NEIGHBORHOODS: &[Location] = &[
    GREEN_VALLEY_PARK,
    ANTHEM_HILLS_PARK,
    CORNERSTONE_PARK,
    WHITNEY_RANCH,
    SEVEN_HILLS,
];
