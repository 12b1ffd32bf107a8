//! Errors for the planner's outer surfaces.
//!
//! Planning itself never fails; bad appointments are reported as unassigned
//! and grouping faults fall back to singleton groups.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid planner config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid planner config: {0}")]
    InvalidConfig(String),

    #[error("invalid plan request: {0}")]
    Json(#[from] serde_json::Error),
}

/// Faults while clustering appointments into packs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupingError {
    #[error("appointment {appointment_id} has no usable location")]
    MissingLocation { appointment_id: String },

    #[error("appointment {appointment_id} has no usable pickup window")]
    MissingWindow { appointment_id: String },

    #[error("appointment {appointment_id} has non-positive duration {duration_minutes}")]
    InvalidDuration {
        appointment_id: String,
        duration_minutes: i32,
    },
}
