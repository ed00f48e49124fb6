//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Thread-safe fleet facade with single-writer ticks."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pdm_common::{FleetConfig, SharedClock};
use tracing::info;

use crate::equipment::{EquipmentSeed, EquipmentStatus, HistoryEntry, SensorReading};
use crate::errors::{FleetError, Result};
use crate::maintenance::MaintenancePlan;
use crate::registry::{EquipmentRegistry, TickReport};
use crate::summary::FleetSummary;

#[derive(Debug, Clone)]
enum SeedSource {
    Fleet(FleetConfig),
    Fixed { seeds: Vec<EquipmentSeed>, rng_seed: u64 },
}

/// Shared handle over the registry.
///
/// `tick` and `reset` hold the write lock for their full duration, so readers
/// only ever observe fully committed ticks.
#[derive(Debug)]
pub struct FleetEngine {
    registry: RwLock<EquipmentRegistry>,
    source: SeedSource,
    clock: SharedClock,
}

impl FleetEngine {
    pub fn new(fleet: FleetConfig, clock: SharedClock) -> Result<Self> {
        let source = SeedSource::Fleet(fleet);
        let registry = seed_registry(&source, clock.clone())?;
        Ok(Self {
            registry: RwLock::new(registry),
            source,
            clock,
        })
    }

    pub fn from_seeds(seeds: Vec<EquipmentSeed>, rng_seed: u64, clock: SharedClock) -> Result<Self> {
        let source = SeedSource::Fixed { seeds, rng_seed };
        let registry = seed_registry(&source, clock.clone())?;
        Ok(Self {
            registry: RwLock::new(registry),
            source,
            clock,
        })
    }

    pub fn tick(&self) -> TickReport {
        self.registry.write().tick()
    }

    /// Re-seed the registry from the stored seed source.
    pub fn reset(&self) -> Result<()> {
        let fresh = seed_registry(&self.source, self.clock.clone())?;
        let equipment = fresh.len();
        *self.registry.write() = fresh;
        info!(equipment, "fleet registry reset");
        Ok(())
    }

    pub fn status(&self, id: &str) -> Result<EquipmentStatus> {
        self.registry.read().get(id).map(|eq| eq.to_status())
    }

    pub fn list_status(&self) -> Vec<EquipmentStatus> {
        self.registry
            .read()
            .list_all()
            .map(|eq| eq.to_status())
            .collect()
    }

    pub fn sensor_reading(&self, id: &str) -> Result<SensorReading> {
        let registry = self.registry.read();
        let equipment = registry.get(id)?;
        equipment
            .last_reading()
            .cloned()
            .ok_or_else(|| FleetError::not_found(id))
    }

    pub fn history(&self, id: &str) -> Result<Vec<HistoryEntry>> {
        let registry = self.registry.read();
        Ok(registry.get(id)?.history().iter().cloned().collect())
    }

    pub fn summary(&self) -> FleetSummary {
        self.registry.read().summary()
    }

    pub fn maintenance_plan(&self, id: &str) -> Result<MaintenancePlan> {
        let registry = self.registry.read();
        let equipment = registry.get(id)?;
        Ok(MaintenancePlan::for_equipment(equipment, self.clock.now()))
    }

    pub fn tick_count(&self) -> u64 {
        self.registry.read().ticks()
    }

    pub fn equipment_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Current time on the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn seed_registry(source: &SeedSource, clock: SharedClock) -> Result<EquipmentRegistry> {
    match source {
        SeedSource::Fleet(fleet) => EquipmentRegistry::initialize(&fleet.equipment, fleet.seed, clock),
        SeedSource::Fixed { seeds, rng_seed } => {
            EquipmentRegistry::from_seeds(seeds.clone(), *rng_seed, clock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdm_common::SystemClock;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn reset_restores_seeded_state() {
        let engine = FleetEngine::new(FleetConfig::default(), SystemClock::shared()).unwrap();
        let before = engine.list_status();
        for _ in 0..5 {
            engine.tick();
        }
        assert_eq!(engine.tick_count(), 5);
        engine.reset().unwrap();
        assert_eq!(engine.tick_count(), 0);
        let after = engine.list_status();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.equipment_id, b.equipment_id);
            assert_eq!(a.health, b.health);
            assert_eq!(a.rul, b.rul);
        }
    }

    #[test]
    fn concurrent_readers_see_whole_ticks() {
        let engine = Arc::new(FleetEngine::new(FleetConfig::default(), SystemClock::shared()).unwrap());
        let writer = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    engine.tick();
                }
            })
        };
        let reader = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    let statuses = engine.list_status();
                    let first = statuses[0].cycle_count;
                    assert!(statuses.iter().all(|s| s.cycle_count == first));
                    let summary = engine.summary();
                    assert_eq!(
                        summary.healthy_count + summary.warning_count + summary.critical_count,
                        summary.total_equipment
                    );
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(engine.tick_count(), 200);
    }
}
