//! Structured record of planning decisions.
//!
//! Every event is also forwarded to `tracing`, so a subscriber sees the same
//! story the caller gets back in `PlanOutcome::trace`.

use serde::Serialize;

use crate::model::UnassignedReason;
use crate::time::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackAction {
    Pickup,
    Dropoff,
    OverdueDropoff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Excluded {
        appointment_id: String,
        reason: UnassignedReason,
    },
    SoloOverride {
        appointment_id: String,
        manual_group_id: String,
    },
    AutoGroupingFallback {
        error: String,
    },
    ClockSeeded {
        at: TimeOfDay,
        from_current_time: bool,
    },
    UnitArrival {
        unit: String,
        at: TimeOfDay,
        earliest_pickup: TimeOfDay,
        latest_pickup: TimeOfDay,
    },
    SchedulingConflict {
        unit: String,
        arrival: TimeOfDay,
        latest_pickup: TimeOfDay,
    },
    Decision {
        unit: String,
        action: PackAction,
        appointment_id: String,
        /// `None` for overdue drop-offs, which skip cost evaluation.
        cost: Option<f64>,
        at: TimeOfDay,
        pack_size: usize,
    },
    ClockAdvanced {
        unit: String,
        from: TimeOfDay,
        to: TimeOfDay,
    },
    Unreachable {
        unit: String,
        appointment_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanTrace {
    pub events: Vec<TraceEvent>,
}

impl PlanTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TraceEvent) {
        log_event(&event);
        self.events.push(event);
    }

    pub fn decisions(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events
            .iter()
            .filter(|event| matches!(event, TraceEvent::Decision { .. }))
    }
}

fn log_event(event: &TraceEvent) {
    match event {
        TraceEvent::Excluded { appointment_id, reason } => {
            tracing::warn!(
                appointment_id = %appointment_id,
                ?reason,
                "appointment excluded from plan"
            );
        }
        TraceEvent::SoloOverride { appointment_id, manual_group_id } => {
            tracing::warn!(
                appointment_id = %appointment_id,
                manual_group_id = %manual_group_id,
                "solo walk ignores its manual group"
            );
        }
        TraceEvent::AutoGroupingFallback { error } => {
            tracing::warn!(%error, "auto-grouping failed, falling back to singleton groups");
        }
        TraceEvent::ClockSeeded { at, from_current_time } => {
            tracing::debug!(at = %at, from_current_time, "virtual clock seeded");
        }
        TraceEvent::UnitArrival { unit, at, .. } => {
            tracing::debug!(unit = %unit, at = %at, "arrived at walk unit");
        }
        TraceEvent::SchedulingConflict { unit, arrival, latest_pickup } => {
            tracing::warn!(
                unit = %unit,
                arrival = %arrival,
                latest_pickup = %latest_pickup,
                "scheduling conflict: unit reached after its latest pickup"
            );
        }
        TraceEvent::Decision { unit, action, appointment_id, cost, at, pack_size } => {
            tracing::debug!(
                unit = %unit,
                ?action,
                appointment_id = %appointment_id,
                ?cost,
                at = %at,
                pack_size,
                "pack decision"
            );
        }
        TraceEvent::ClockAdvanced { unit, from, to } => {
            tracing::debug!(
                unit = %unit,
                from = %from,
                to = %to,
                "no valid action, advancing clock"
            );
        }
        TraceEvent::Unreachable { unit, appointment_ids } => {
            tracing::warn!(unit = %unit, ?appointment_ids, "pickup windows can no longer be met");
        }
    }
}
