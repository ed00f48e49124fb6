//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Typed failures returned by the fleet engine."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FleetError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FleetError {
    #[error("equipment {id} not found")]
    NotFound { id: String },
    #[error("invalid fleet configuration: {0}")]
    Config(String),
    #[error("insufficient sensor data: {provided} numeric readings supplied, {required} required")]
    InsufficientSensors { provided: usize, required: usize },
}

impl FleetError {
    pub fn not_found(id: impl Into<String>) -> Self {
        FleetError::NotFound { id: id.into() }
    }
}
