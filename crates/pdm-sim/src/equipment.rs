//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Equipment records, alerts, and bounded sensor history."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use pdm_common::{EquipmentCategory, EquipmentSpec};
use serde::{Deserialize, Serialize};

use crate::alerts::Alert;
use crate::degradation::{HealthState, NextState, Status};
use crate::errors::{FleetError, Result};
use crate::profile::{profile, SensorKind};

/// Number of snapshots retained per machine.
pub const HISTORY_CAPACITY: usize = 100;

/// Sensor name to value mapping in profile order.
pub type SensorValues = IndexMap<SensorKind, f64>;

/// Latest synthesized telemetry for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub equipment_id: String,
    pub timestamp: DateTime<Utc>,
    pub values: SensorValues,
}

/// Snapshot appended to the sensor history on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub sensor_data: SensorValues,
    pub health: f64,
    pub rul: f64,
}

/// FIFO ring of history entries capped at a fixed capacity.
#[derive(Debug, Clone)]
pub struct SensorHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl SensorHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

impl Default for SensorHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

/// Explicit starting state for one machine.
#[derive(Debug, Clone)]
pub struct EquipmentSeed {
    pub spec: EquipmentSpec,
    pub health: f64,
    pub degradation_rate: f64,
    pub rul: f64,
    pub last_maintenance: DateTime<Utc>,
    pub next_maintenance: DateTime<Utc>,
}

/// One monitored machine. Mutated only by the registry tick.
#[derive(Debug, Clone)]
pub struct Equipment {
    pub(crate) spec: EquipmentSpec,
    pub(crate) health: f64,
    pub(crate) degradation_rate: f64,
    pub(crate) rul: f64,
    pub(crate) cycle_count: u64,
    pub(crate) status: Status,
    pub(crate) last_maintenance: DateTime<Utc>,
    pub(crate) next_maintenance: DateTime<Utc>,
    pub(crate) alerts: Vec<Alert>,
    pub(crate) history: SensorHistory,
    pub(crate) last_reading: Option<SensorReading>,
}

impl Equipment {
    pub fn from_seed(seed: EquipmentSeed) -> Result<Self> {
        if seed.spec.id.trim().is_empty() {
            return Err(FleetError::Config("equipment ids must not be blank".into()));
        }
        if !(seed.degradation_rate.is_finite() && seed.degradation_rate > 0.0) {
            return Err(FleetError::Config(format!(
                "equipment {} degradation rate must be positive, got {}",
                seed.spec.id, seed.degradation_rate
            )));
        }
        if !(seed.health.is_finite() && seed.rul.is_finite()) {
            return Err(FleetError::Config(format!(
                "equipment {} health and rul must be finite",
                seed.spec.id
            )));
        }
        let health = seed.health.clamp(0.0, 100.0);
        Ok(Self {
            spec: seed.spec,
            health,
            degradation_rate: seed.degradation_rate,
            rul: seed.rul.max(0.0),
            cycle_count: 0,
            status: Status::from_health(health),
            last_maintenance: seed.last_maintenance,
            next_maintenance: seed.next_maintenance,
            alerts: Vec::new(),
            history: SensorHistory::default(),
            last_reading: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &EquipmentSpec {
        &self.spec
    }

    pub fn category(&self) -> EquipmentCategory {
        self.spec.category
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn degradation_rate(&self) -> f64 {
        self.degradation_rate
    }

    pub fn rul(&self) -> f64 {
        self.rul
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_maintenance(&self) -> DateTime<Utc> {
        self.last_maintenance
    }

    pub fn next_maintenance(&self) -> DateTime<Utc> {
        self.next_maintenance
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn history(&self) -> &SensorHistory {
        &self.history
    }

    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last_reading.as_ref()
    }

    pub(crate) fn health_state(&self) -> HealthState {
        HealthState {
            health: self.health,
            degradation_rate: self.degradation_rate,
            rul: self.rul,
            cycle_count: self.cycle_count,
        }
    }

    pub(crate) fn apply(&mut self, next: NextState) {
        self.health = next.health;
        self.rul = next.rul;
        self.cycle_count = next.cycle_count;
        self.status = next.status;
    }

    pub(crate) fn record_reading(&mut self, timestamp: DateTime<Utc>, values: SensorValues) {
        self.history.push(HistoryEntry {
            timestamp,
            sensor_data: values.clone(),
            health: self.health,
            rul: self.rul,
        });
        self.cache_reading(timestamp, values);
    }

    pub(crate) fn cache_reading(&mut self, timestamp: DateTime<Utc>, values: SensorValues) {
        self.last_reading = Some(SensorReading {
            equipment_id: self.spec.id.clone(),
            timestamp,
            values,
        });
    }

    /// Owned view handed to readers outside the registry lock.
    pub fn to_status(&self) -> EquipmentStatus {
        EquipmentStatus {
            equipment_id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            location: self.spec.location.clone(),
            category: self.spec.category,
            health: self.health,
            rul: self.rul,
            cycle_count: self.cycle_count,
            status: self.status,
            last_maintenance: self.last_maintenance,
            next_maintenance: self.next_maintenance,
            rated_life_hours: profile(self.spec.category).rated_life_hours,
            alerts: self.alerts.clone(),
        }
    }
}

/// Status payload consumed by the HTTP layer and report builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentStatus {
    pub equipment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub category: EquipmentCategory,
    pub health: f64,
    pub rul: f64,
    pub cycle_count: u64,
    pub status: Status,
    pub last_maintenance: DateTime<Utc>,
    pub next_maintenance: DateTime<Utc>,
    pub rated_life_hours: u32,
    pub alerts: Vec<Alert>,
}
