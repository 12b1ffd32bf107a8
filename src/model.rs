//! Request and response shapes for the planner.
//!
//! Appointments are read-only input; stops and routes are built fresh per
//! planning call.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::time::{TimeOfDay, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within latitude/longitude range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkType {
    Solo,
    #[default]
    Group,
    Training,
    Other,
}

impl WalkType {
    /// Solo and training walks are never merged into a pack.
    pub fn is_groupable(self) -> bool {
        !matches!(self, WalkType::Solo | WalkType::Training)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Pet {
    /// Geocoded location, if the pet has a usable one.
    pub fn location(&self) -> Option<Coordinates> {
        let coords = Coordinates::new(self.lat?, self.lng?);
        coords.is_valid().then_some(coords)
    }
}

/// A dog-walking appointment as stored by the caller.
///
/// Times stay as the raw stored strings; the planner parses them and skips
/// the appointment when the window is unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub pet: Pet,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub walk_type: WalkType,
    #[serde(default)]
    pub manual_group_id: Option<String>,
}

impl Appointment {
    pub fn location(&self) -> Option<Coordinates> {
        self.pet.location()
    }

    /// Parsed pickup window; `None` if either bound is unparsable or the
    /// window ends before it starts.
    pub fn pickup_window(&self) -> Option<TimeWindow> {
        let start = TimeOfDay::parse(&self.start_time)?;
        let end = TimeOfDay::parse(&self.end_time)?;
        TimeWindow::new(start, end)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub start_location: Option<Coordinates>,
    #[serde(default)]
    pub compare: bool,
    /// Wall-clock time for intra-day re-planning.
    #[serde(default)]
    pub current_time: Option<TimeOfDay>,
}

impl PlanRequest {
    pub fn from_json_str(raw: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopType {
    Pickup,
    Dropoff,
    Solo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub id: String,
    pub sequence: usize,
    pub appointment_id: String,
    pub pet_id: String,
    pub pet_name: String,
    pub address: Option<String>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    /// Target walk duration of the appointment in minutes.
    pub duration: i32,
    pub walk_type: WalkType,
    pub walk_group_id: Option<String>,
    pub stop_type: StopType,
    pub coordinates: Coordinates,
    /// Forced drop-off of a dog past its walk tolerance.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub overdue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    MissingLocation,
    InvalidWindow,
    /// Walk length is not a positive number of minutes within a day.
    InvalidDuration,
    /// Pickup window could not be met once the pack simulation ran out of
    /// actions and future events.
    WindowUnreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedAppointment {
    pub appointment_id: String,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub original_distance: f64,
    pub original_time: f64,
    pub distance_saved: f64,
    pub time_saved: f64,
    pub improvement_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub route: Vec<Stop>,
    /// Miles.
    pub total_distance: f64,
    /// Minutes.
    pub total_travel_time: f64,
    pub total_walk_time: i32,
    pub total_time: f64,
    pub path_coordinates: Vec<Coordinates>,
    pub optimized: bool,
    pub groups_count: usize,
    pub solo_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unassigned: Vec<UnassignedAppointment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

impl Route {
    /// Route for a day with nothing to plan.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            route: Vec::new(),
            total_distance: 0.0,
            total_travel_time: 0.0,
            total_walk_time: 0,
            total_time: 0.0,
            path_coordinates: Vec::new(),
            optimized: false,
            groups_count: 0,
            solo_count: 0,
            unassigned: Vec::new(),
            warnings: Vec::new(),
            message: Some(message.into()),
            comparison: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pet(lat: Option<f64>, lng: Option<f64>) -> Pet {
        Pet {
            id: "p1".into(),
            name: "Biscuit".into(),
            address: None,
            lat,
            lng,
        }
    }

    #[test]
    fn location_requires_both_coordinates_in_range() {
        assert!(pet(Some(36.0), Some(-115.0)).location().is_some());
        assert!(pet(None, Some(-115.0)).location().is_none());
        assert!(pet(Some(91.0), Some(-115.0)).location().is_none());
        assert!(pet(Some(f64::NAN), Some(-115.0)).location().is_none());
    }

    #[test]
    fn walk_type_groupability() {
        assert!(WalkType::Group.is_groupable());
        assert!(WalkType::Other.is_groupable());
        assert!(!WalkType::Solo.is_groupable());
        assert!(!WalkType::Training.is_groupable());
    }

    #[test]
    fn appointment_deserializes_with_defaults() {
        let json = r#"{
            "id": "a1",
            "pet": {"id": "p1", "name": "Biscuit", "lat": 36.0, "lng": -115.0},
            "start_time": "10:00",
            "end_time": "10:30",
            "duration_minutes": 30
        }"#;
        let appointment: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(appointment.walk_type, WalkType::Group);
        assert!(appointment.manual_group_id.is_none());
        let window = appointment.pickup_window().unwrap();
        assert_eq!(window.start, TimeOfDay::from_hm(10, 0));
    }

    #[test]
    fn request_rejects_malformed_json() {
        let err = PlanRequest::from_json_str(r#"{"appointments": [{"id": 1}]}"#).unwrap_err();
        assert!(matches!(err, PlanError::Json(_)));

        let raw = r#"{"appointments": [], "current_time": "09:15"}"#;
        let request = PlanRequest::from_json_str(raw).unwrap();
        assert!(!request.compare);
        assert_eq!(request.current_time, Some(TimeOfDay::from_hm(9, 15)));
    }

    #[test]
    fn unparsable_window_is_absent() {
        let appointment = Appointment {
            id: "a1".into(),
            pet: pet(Some(36.0), Some(-115.0)),
            start_time: "soon".into(),
            end_time: "10:30".into(),
            duration_minutes: 30,
            walk_type: WalkType::Solo,
            manual_group_id: None,
        };
        assert!(appointment.pickup_window().is_none());
    }

    #[test]
    fn empty_route_serializes_zero_totals() {
        let value = serde_json::to_value(Route::empty("nothing to plan")).unwrap();
        assert_eq!(value["route"], serde_json::json!([]));
        assert_eq!(value["total_distance"], 0.0);
        assert_eq!(value["total_walk_time"], 0);
        assert_eq!(value["optimized"], false);
        assert!(value.get("comparison").is_none());
    }
}
