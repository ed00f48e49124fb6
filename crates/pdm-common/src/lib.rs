//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Shared primitives and utilities for the core runtime."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Core shared primitives for the PDM fleet simulator workspace.
//! This crate exposes configuration loading, logging, and the injectable
//! clock consumed across the workspace.

pub mod clock;
pub mod config;
pub mod logging;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{
    ApiConfig, AppConfig, EquipmentCategory, EquipmentSpec, FleetConfig, LoggingConfig,
    MetricsConfig, SimulationConfig,
};
pub use logging::{filter_from_env, init_tracing, LogFormat};
