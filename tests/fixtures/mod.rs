//! Test fixtures for pack-planner.
//!
//! Provides:
//! - Real Henderson, NV residential locations
//! - A builder for appointments with sensible defaults

#![allow(dead_code)]

pub mod henderson_locations;

pub use henderson_locations::*;

use pack_planner::model::{Appointment, Coordinates, Pet, WalkType};
use pack_planner::time::TimeOfDay;

/// Builder for test appointments.
#[derive(Clone, Debug)]
pub struct TestAppointment {
    id: String,
    pet_name: String,
    location: Option<Coordinates>,
    start_time: String,
    end_time: String,
    duration_minutes: i32,
    walk_type: WalkType,
    manual_group_id: Option<String>,
}

impl TestAppointment {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            pet_name: format!("Dog {id}"),
            location: Some(GREEN_VALLEY_PARK.coords()),
            start_time: "10:00".to_string(),
            end_time: "10:30".to_string(),
            duration_minutes: 30,
            walk_type: WalkType::Group,
            manual_group_id: None,
        }
    }

    pub fn at(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    pub fn ungeocoded(mut self) -> Self {
        self.location = None;
        self
    }

    pub fn window(mut self, start: &str, end: &str) -> Self {
        self.start_time = start.to_string();
        self.end_time = end.to_string();
        self
    }

    pub fn duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn walk_type(mut self, walk_type: WalkType) -> Self {
        self.walk_type = walk_type;
        self
    }

    pub fn solo(self) -> Self {
        self.walk_type(WalkType::Solo)
    }

    pub fn in_group(mut self, group_id: &str) -> Self {
        self.manual_group_id = Some(group_id.to_string());
        self
    }

    pub fn build(self) -> Appointment {
        Appointment {
            pet: Pet {
                id: format!("pet-{}", self.id),
                name: self.pet_name,
                address: Some(format!("{} Test Ln, Henderson, NV", self.id.len() * 100)),
                lat: self.location.map(|c| c.lat),
                lng: self.location.map(|c| c.lng),
            },
            id: self.id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            walk_type: self.walk_type,
            manual_group_id: self.manual_group_id,
        }
    }
}

pub fn hm(hours: i32, minutes: i32) -> TimeOfDay {
    TimeOfDay::from_hm(hours, minutes)
}
