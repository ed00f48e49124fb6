//! ---
//! pdm_section: "12-runtime"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Runtime helpers supporting the simulation orchestrator."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Scheduling helpers for the maintenance simulator runtime.

pub mod scheduling;

pub use scheduling::{RateLimiter, TaskGroup};
