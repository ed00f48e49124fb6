//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "01-bootstrap"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Simulation runtime module exports and shared types."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Equipment health simulation and monitoring engine.
//!
//! A tick advances every machine in registry order: degradation, telemetry
//! synthesis, bounded history, then alert pruning and evaluation.

pub mod alerts;
pub mod degradation;
pub mod engine;
pub mod equipment;
pub mod errors;
pub mod inference;
pub mod maintenance;
pub mod profile;
pub mod registry;
pub mod summary;
pub mod telemetry;

pub use alerts::{Alert, AlertKind, AlertManager, Severity};
pub use degradation::{DegradationEngine, HealthState, NextState, Status};
pub use engine::FleetEngine;
pub use equipment::{
    Equipment, EquipmentSeed, EquipmentStatus, HistoryEntry, SensorHistory, SensorReading,
    SensorValues, HISTORY_CAPACITY,
};
pub use errors::{FleetError, Result};
pub use inference::{
    run_ensemble, ModelInput, PredictionReport, RulPredictor, MIN_SENSOR_VALUES, MODEL_FEATURES,
};
pub use maintenance::{plan_tasks, MaintenancePlan, MaintenanceTask, TaskPriority};
pub use profile::{profile, CategoryProfile, SensorKind, SensorRange};
pub use registry::{EquipmentRegistry, RaisedAlert, TickReport};
pub use summary::FleetSummary;
pub use telemetry::{noise_amplitude, TelemetrySynthesizer};
