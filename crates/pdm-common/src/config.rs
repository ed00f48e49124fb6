//! ---
//! pdm_section: "01-core-functionality"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Shared primitives and utilities for the core runtime."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::logging::LogFormat;

fn default_fleet_seed() -> u64 {
    0x0DCA_5EED
}

fn default_roster() -> Vec<EquipmentSpec> {
    PLANT_ROSTER
        .iter()
        .map(|(id, name, category, location)| EquipmentSpec {
            id: (*id).to_owned(),
            category: *category,
            name: Some((*name).to_owned()),
            location: Some((*location).to_owned()),
        })
        .collect()
}

fn default_auto_tick() -> bool {
    true
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

const INGREDIENT_BAY: &str = "Ingredient Processing Bay";
const DOUGH_LINE: &str = "Dough Production Line";
const ASSEMBLY_FLOOR: &str = "Assembly Floor";
const BAKING_STATION: &str = "Baking Station";
const PACKAGING_BAY: &str = "Packaging Bay";

/// Demo plant used when no `[fleet]` section is configured.
const PLANT_ROSTER: &[(&str, &str, EquipmentCategory, &str)] = &[
    ("SI-100", "Sauce Mixer #1", EquipmentCategory::Mixer, INGREDIENT_BAY),
    ("SI-101", "Sauce Mixer #2", EquipmentCategory::Mixer, INGREDIENT_BAY),
    ("SI-102", "Cheese Grater #1", EquipmentCategory::Generic, INGREDIENT_BAY),
    ("SI-103", "Cheese Grater #2", EquipmentCategory::Generic, INGREDIENT_BAY),
    ("SI-104", "Ingredient Dispenser", EquipmentCategory::Dispenser, INGREDIENT_BAY),
    ("SI-105", "Sauce Heater", EquipmentCategory::Oven, INGREDIENT_BAY),
    ("DP-100", "Dough Mixer", EquipmentCategory::Mixer, DOUGH_LINE),
    ("DP-101", "Dough Kneader", EquipmentCategory::Mixer, DOUGH_LINE),
    ("DP-102", "Dough Roller", EquipmentCategory::Generic, DOUGH_LINE),
    ("DP-103", "Proofing Chamber", EquipmentCategory::Generic, DOUGH_LINE),
    ("DP-104", "Dough Cutter", EquipmentCategory::Generic, DOUGH_LINE),
    ("AP-100", "Assembly Conveyor #1", EquipmentCategory::Conveyor, ASSEMBLY_FLOOR),
    ("AP-101", "Assembly Conveyor #2", EquipmentCategory::Conveyor, ASSEMBLY_FLOOR),
    ("AP-102", "Assembly Conveyor #3", EquipmentCategory::Conveyor, ASSEMBLY_FLOOR),
    ("AP-103", "Sauce Applicator", EquipmentCategory::Dispenser, ASSEMBLY_FLOOR),
    ("AP-104", "Cheese Applicator", EquipmentCategory::Generic, ASSEMBLY_FLOOR),
    ("AP-105", "Topping Robot #1", EquipmentCategory::Generic, ASSEMBLY_FLOOR),
    ("AP-106", "Topping Robot #2", EquipmentCategory::Generic, ASSEMBLY_FLOOR),
    ("AP-107", "Quality Scanner", EquipmentCategory::Generic, ASSEMBLY_FLOOR),
    ("BC-100", "Tunnel Oven #1", EquipmentCategory::Oven, BAKING_STATION),
    ("BC-101", "Tunnel Oven #2", EquipmentCategory::Oven, BAKING_STATION),
    ("BC-102", "Temperature Controller", EquipmentCategory::Generic, BAKING_STATION),
    ("BC-103", "Heat Recovery System", EquipmentCategory::Generic, BAKING_STATION),
    ("PO-100", "Packaging Line", EquipmentCategory::Generic, PACKAGING_BAY),
    ("PO-101", "Palletizer", EquipmentCategory::Generic, PACKAGING_BAY),
];

/// Primary configuration object for the fleet simulator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "PDM_CONFIG";

    /// Load configuration from disk, respecting the `PDM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike an explicit `PDM_CONFIG` path, missing candidates are not an
    /// error: the built-in demo plant is used instead.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using built-in plant roster"
        );
        let config = Self::default();
        config.validate()?;
        Ok(LoadedAppConfig {
            config,
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.fleet.validate()?;
        if self.simulation.tick_interval.is_zero() {
            return Err(anyhow!("simulation tick_interval must be greater than zero"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Equipment class selecting telemetry ranges and lifespan assumptions.
#[derive(
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EquipmentCategory {
    Oven,
    Mixer,
    Conveyor,
    Dispenser,
    #[default]
    Generic,
}

impl EquipmentCategory {
    /// Liquid-handling equipment additionally reports `flow_rate`.
    pub fn is_liquid_handling(&self) -> bool {
        matches!(self, EquipmentCategory::Dispenser)
    }
}

/// Seed description of a single machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquipmentSpec {
    pub id: String,
    #[serde(default)]
    pub category: EquipmentCategory,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl EquipmentSpec {
    pub fn new(id: impl Into<String>, category: EquipmentCategory) -> Self {
        Self {
            id: id.into(),
            category,
            name: None,
            location: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_fleet_seed")]
    pub seed: u64,
    #[serde(default = "default_roster")]
    pub equipment: Vec<EquipmentSpec>,
}

impl FleetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.equipment.is_empty() {
            return Err(anyhow!("fleet must declare at least one piece of equipment"));
        }
        let mut seen = HashSet::new();
        for spec in &self.equipment {
            if spec.id.trim().is_empty() {
                return Err(anyhow!("equipment ids must not be blank"));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(anyhow!("duplicate equipment id '{}'", spec.id));
            }
        }
        Ok(())
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            seed: default_fleet_seed(),
            equipment: default_roster(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_auto_tick")]
    pub auto_tick: bool,
    #[serde(default = "default_tick_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            auto_tick: default_auto_tick(),
            tick_interval: default_tick_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    use tempfile::NamedTempFile;

    #[test]
    fn default_config_uses_plant_roster() {
        let config = AppConfig::default();
        assert_eq!(config.fleet.equipment.len(), 25);
        assert_eq!(config.fleet.equipment[0].id, "SI-100");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_explicit_fleet() {
        let config = AppConfig::from_str(
            r#"
            [fleet]
            seed = 7

            [[fleet.equipment]]
            id = "EQ001"
            category = "oven"

            [[fleet.equipment]]
            id = "EQ002"

            [simulation]
            tick_interval = 2
            "#,
        )
        .expect("valid config");
        assert_eq!(config.fleet.seed, 7);
        assert_eq!(config.fleet.equipment[0].category, EquipmentCategory::Oven);
        assert_eq!(config.fleet.equipment[1].category, EquipmentCategory::Generic);
        assert_eq!(config.simulation.tick_interval, Duration::from_secs(2));
        assert!(config.simulation.auto_tick);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = AppConfig::from_str(
            r#"
            [[fleet.equipment]]
            id = "EQ001"

            [[fleet.equipment]]
            id = "EQ001"
            "#,
        )
        .expect_err("duplicates rejected");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_empty_fleet() {
        let err = AppConfig::from_str("[fleet]\nequipment = []\n").expect_err("empty rejected");
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn rejects_zero_tick_interval() {
        assert!(AppConfig::from_str("[simulation]\ntick_interval = 0\n").is_err());
    }

    #[test]
    fn loads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[[fleet.equipment]]\nid = \"M-1\"\ncategory = \"mixer\"")?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(loaded.config.fleet.equipment.len(), 1);
        Ok(())
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(
            EquipmentCategory::from_str("Conveyor").unwrap(),
            EquipmentCategory::Conveyor
        );
        assert_eq!(EquipmentCategory::Dispenser.to_string(), "dispenser");
        assert!(EquipmentCategory::Dispenser.is_liquid_handling());
        assert!(!EquipmentCategory::Oven.is_liquid_handling());
    }
}
