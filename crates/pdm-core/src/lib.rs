//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Primary orchestration and lifecycle management."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Runtime lifecycle for the fleet simulator: periodic ticking, metric
//! publication, and coordinated shutdown.

pub mod orchestrator;

pub use orchestrator::{publish_fleet, timed_tick, OrchestratorHandle, SimulationOrchestrator};
