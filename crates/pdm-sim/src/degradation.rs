//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Per-tick health, RUL, and status progression."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Health decays linearly by the machine's fixed rate; RUL follows a
//! proportional-decay policy (`rul * health / 100`) and status is derived
//! from health with the 80/60 threshold table.

use serde::{Deserialize, Serialize};
use strum::Display;

pub const MAX_HEALTH: f64 = 100.0;
pub const HEALTHY_MIN: f64 = 80.0;
pub const WARNING_MIN: f64 = 60.0;

/// Derived classification of a machine's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Healthy,
    Warning,
    Critical,
}

impl Status {
    pub fn from_health(health: f64) -> Self {
        if health >= HEALTHY_MIN {
            Status::Healthy
        } else if health >= WARNING_MIN {
            Status::Warning
        } else {
            Status::Critical
        }
    }
}

/// Inputs to a single degradation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthState {
    pub health: f64,
    pub degradation_rate: f64,
    pub rul: f64,
    pub cycle_count: u64,
}

/// Result of a degradation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextState {
    pub health: f64,
    pub rul: f64,
    pub cycle_count: u64,
    pub status: Status,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DegradationEngine;

impl DegradationEngine {
    pub fn step(state: &HealthState) -> NextState {
        let health = (state.health - state.degradation_rate).clamp(0.0, MAX_HEALTH);
        let rul = (state.rul * (health / MAX_HEALTH)).max(0.0);
        NextState {
            health,
            rul,
            cycle_count: state.cycle_count.saturating_add(1),
            status: Status::from_health(health),
        }
    }
}
