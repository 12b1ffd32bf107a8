//! Planner tuning.
//!
//! Grouping thresholds, pack limits and the empirical cost weights of the
//! pack simulation. Options load from a TOML file where every key is
//! optional.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::PlanError;
use crate::haversine::DEFAULT_WALKING_SPEED_MPH;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    pub walking_speed_mph: f64,
    pub grouping: GroupingOptions,
    pub pack: PackLimits,
    pub weights: CostWeights,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            walking_speed_mph: DEFAULT_WALKING_SPEED_MPH,
            grouping: GroupingOptions::default(),
            pack: PackLimits::default(),
            weights: CostWeights::default(),
        }
    }
}

impl PlannerOptions {
    pub fn from_toml_str(raw: &str) -> Result<Self, PlanError> {
        let options: Self = toml::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| PlanError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the clock and the pack simulation cannot work with.
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |reason: &str| Err(PlanError::InvalidConfig(reason.to_string()));

        if !(self.walking_speed_mph.is_finite() && self.walking_speed_mph > 0.0) {
            return invalid("walking_speed_mph must be a positive number");
        }
        if self.grouping.max_group_size == 0 {
            return invalid("grouping.max_group_size must be at least 1");
        }
        if self.pack.capacity == 0 {
            return invalid("pack.capacity must be at least 1");
        }
        if self.pack.pickup_candidate_limit == 0 {
            return invalid("pack.pickup_candidate_limit must be at least 1");
        }
        if self.pack.tolerance_minutes < 0 {
            return invalid("pack.tolerance_minutes must not be negative");
        }
        if self.pack.pickup_service_minutes < 0 || self.pack.dropoff_service_minutes < 0 {
            return invalid("pack service minutes must not be negative");
        }
        Ok(())
    }
}

/// Proximity/time compatibility for pack suggestions and auto-grouping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupingOptions {
    /// A candidate must be within this distance of some group member.
    pub max_distance_miles: f64,
    pub max_group_size: usize,
    /// Slack allowed between two walk windows that do not strictly overlap.
    pub time_buffer_minutes: i32,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            max_distance_miles: 0.5,
            max_group_size: 4,
            time_buffer_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackLimits {
    /// Dogs walked at the same time.
    pub capacity: usize,
    /// Allowed deviation from the target walk duration, either way.
    pub tolerance_minutes: i32,
    pub pickup_service_minutes: i32,
    pub dropoff_service_minutes: i32,
    /// Nearest waiting dogs considered for pickup at each step.
    pub pickup_candidate_limit: usize,
    pub chaining_radius_miles: f64,
    /// Windows closing sooner than this earn an urgency bonus.
    pub urgency_horizon_minutes: f64,
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            capacity: 4,
            tolerance_minutes: 10,
            pickup_service_minutes: 5,
            dropoff_service_minutes: 2,
            pickup_candidate_limit: 3,
            chaining_radius_miles: 0.3,
            urgency_horizon_minutes: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Per minute of deviation from the target duration at drop-off.
    pub duration_deviation: f64,
    /// Subtracted from a drop-off while the pack is full.
    pub pack_relief_bonus: f64,
    /// Subtracted per open pickup near a drop-off location.
    pub chaining_bonus: f64,
    /// Added when a pickup would push a walked dog past its tolerance.
    pub overdue_penalty: f64,
    /// Added when a pickup would bring a walked dog within the tolerance
    /// margin of its limit.
    pub near_overdue_penalty: f64,
    /// Per minute of mismatch between a pickup's duration and the pack's
    /// average remaining walk time.
    pub duration_compatibility: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            duration_deviation: 2.0,
            pack_relief_bonus: 20.0,
            chaining_bonus: 10.0,
            overdue_penalty: 100.0,
            near_overdue_penalty: 30.0,
            duration_compatibility: 0.5,
        }
    }
}
