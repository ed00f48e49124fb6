//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Equipment store and the per-tick batch driver."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use pdm_common::{EquipmentSpec, SharedClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::alerts::{Alert, AlertManager};
use crate::degradation::DegradationEngine;
use crate::equipment::{Equipment, EquipmentSeed};
use crate::errors::{FleetError, Result};
use crate::summary::FleetSummary;
use crate::telemetry::TelemetrySynthesizer;

const INITIAL_HEALTH: (f64, f64) = (70.0, 100.0);
const INITIAL_DEGRADATION_RATE: (f64, f64) = (0.1, 0.5);
const INITIAL_RUL: (f64, f64) = (800.0, 1200.0);
const LAST_MAINTENANCE_DAYS_AGO: (i64, i64) = (30, 180);
const NEXT_MAINTENANCE_DAYS_AHEAD: (i64, i64) = (30, 90);

/// Alert raised on a specific machine during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaisedAlert {
    pub equipment_id: String,
    pub alert: Alert,
}

/// Outcome of a single simulation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub equipment_updated: usize,
    pub alerts_raised: Vec<RaisedAlert>,
}

/// Owns every equipment record together with the seeded random source.
#[derive(Debug)]
pub struct EquipmentRegistry {
    equipment: IndexMap<String, Equipment>,
    rng: StdRng,
    clock: SharedClock,
    ticks: u64,
}

impl EquipmentRegistry {
    /// Seed one machine per spec with randomized, bounded starting state.
    pub fn initialize(specs: &[EquipmentSpec], rng_seed: u64, clock: SharedClock) -> Result<Self> {
        if specs.is_empty() {
            return Err(FleetError::Config(
                "fleet must declare at least one piece of equipment".into(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(rng_seed);
        let now = clock.now();
        let seeds = specs
            .iter()
            .map(|spec| random_seed(spec.clone(), now, &mut rng))
            .collect();
        let registry = Self::build(seeds, rng, clock)?;
        info!(
            equipment = registry.len(),
            rng_seed, "equipment registry initialised"
        );
        Ok(registry)
    }

    /// Build a registry from explicit starting states.
    pub fn from_seeds(seeds: Vec<EquipmentSeed>, rng_seed: u64, clock: SharedClock) -> Result<Self> {
        if seeds.is_empty() {
            return Err(FleetError::Config(
                "fleet must declare at least one piece of equipment".into(),
            ));
        }
        Self::build(seeds, StdRng::seed_from_u64(rng_seed), clock)
    }

    fn build(seeds: Vec<EquipmentSeed>, mut rng: StdRng, clock: SharedClock) -> Result<Self> {
        let now = clock.now();
        let mut equipment = IndexMap::with_capacity(seeds.len());
        for seed in seeds {
            let id = seed.spec.id.clone();
            if equipment.contains_key(&id) {
                return Err(FleetError::Config(format!("duplicate equipment id '{id}'")));
            }
            let mut record = Equipment::from_seed(seed)?;
            let values = TelemetrySynthesizer::synthesize(record.category(), record.health(), &mut rng);
            record.cache_reading(now, values);
            equipment.insert(id, record);
        }
        Ok(Self {
            equipment,
            rng,
            clock,
            ticks: 0,
        })
    }

    pub fn get(&self, id: &str) -> Result<&Equipment> {
        self.equipment
            .get(id)
            .ok_or_else(|| FleetError::not_found(id))
    }

    /// All machines in insertion order.
    pub fn list_all(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values()
    }

    pub fn len(&self) -> usize {
        self.equipment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::from_equipment(self.list_all(), self.clock.now())
    }

    /// Advance every machine exactly once, in registry order.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.ticks += 1;
        let mut alerts_raised = Vec::new();
        for equipment in self.equipment.values_mut() {
            let next = DegradationEngine::step(&equipment.health_state());
            equipment.apply(next);
            let values =
                TelemetrySynthesizer::synthesize(equipment.category(), equipment.health(), &mut self.rng);
            equipment.record_reading(now, values);
            for alert in AlertManager::evaluate(equipment, now) {
                alerts_raised.push(RaisedAlert {
                    equipment_id: equipment.id().to_owned(),
                    alert,
                });
            }
        }
        debug!(
            tick = self.ticks,
            equipment = self.equipment.len(),
            alerts_raised = alerts_raised.len(),
            "simulation tick applied"
        );
        TickReport {
            tick: self.ticks,
            timestamp: now,
            equipment_updated: self.equipment.len(),
            alerts_raised,
        }
    }
}

fn random_seed(spec: EquipmentSpec, now: DateTime<Utc>, rng: &mut StdRng) -> EquipmentSeed {
    let health = rng.gen_range(INITIAL_HEALTH.0..=INITIAL_HEALTH.1);
    let degradation_rate = rng.gen_range(INITIAL_DEGRADATION_RATE.0..=INITIAL_DEGRADATION_RATE.1);
    let rul = rng.gen_range(INITIAL_RUL.0..=INITIAL_RUL.1);
    let last_days = rng.gen_range(LAST_MAINTENANCE_DAYS_AGO.0..=LAST_MAINTENANCE_DAYS_AGO.1);
    let next_days = rng.gen_range(NEXT_MAINTENANCE_DAYS_AHEAD.0..=NEXT_MAINTENANCE_DAYS_AHEAD.1);
    EquipmentSeed {
        spec,
        health,
        degradation_rate,
        rul,
        last_maintenance: now - Duration::days(last_days),
        next_maintenance: now + Duration::days(next_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pdm_common::{EquipmentCategory, ManualClock};
    use std::sync::Arc;

    fn clock() -> SharedClock {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ))
    }

    fn specs(n: usize) -> Vec<EquipmentSpec> {
        (1..=n)
            .map(|i| EquipmentSpec::new(format!("EQ{i:03}"), EquipmentCategory::Generic))
            .collect()
    }

    #[test]
    fn initialize_rejects_empty_fleet() {
        let err = EquipmentRegistry::initialize(&[], 1, clock()).unwrap_err();
        assert!(matches!(err, FleetError::Config(_)));
    }

    #[test]
    fn initialize_rejects_duplicate_ids() {
        let mut fleet = specs(2);
        fleet.push(EquipmentSpec::new("EQ001", EquipmentCategory::Oven));
        let err = EquipmentRegistry::initialize(&fleet, 1, clock()).unwrap_err();
        assert!(matches!(err, FleetError::Config(msg) if msg.contains("EQ001")));
    }

    #[test]
    fn seeded_state_is_bounded() {
        let registry = EquipmentRegistry::initialize(&specs(50), 17, clock()).unwrap();
        let now = registry.clock().now();
        for eq in registry.list_all() {
            assert!((70.0..=100.0).contains(&eq.health()));
            assert!((0.1..=0.5).contains(&eq.degradation_rate()));
            assert!((800.0..=1200.0).contains(&eq.rul()));
            assert_eq!(eq.cycle_count(), 0);
            assert!(eq.last_maintenance() <= now - Duration::days(30));
            assert!(eq.next_maintenance() >= now + Duration::days(30));
            assert!(eq.last_reading().is_some());
            assert!(eq.history().is_empty());
        }
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = EquipmentRegistry::initialize(&specs(5), 3, clock()).unwrap();
        let ids: Vec<&str> = registry.list_all().map(Equipment::id).collect();
        assert_eq!(ids, vec!["EQ001", "EQ002", "EQ003", "EQ004", "EQ005"]);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = EquipmentRegistry::initialize(&specs(1), 3, clock()).unwrap();
        assert_eq!(
            registry.get("nope").unwrap_err(),
            FleetError::NotFound { id: "nope".into() }
        );
    }

    #[test]
    fn tick_advances_every_machine_once() {
        let mut registry = EquipmentRegistry::initialize(&specs(4), 9, clock()).unwrap();
        let report = registry.tick();
        assert_eq!(report.tick, 1);
        assert_eq!(report.equipment_updated, 4);
        for eq in registry.list_all() {
            assert_eq!(eq.cycle_count(), 1);
            assert_eq!(eq.history().len(), 1);
            let latest = eq.history().latest().unwrap();
            assert_eq!(latest.health, eq.health());
            assert_eq!(
                eq.last_reading().map(|r| &r.values),
                Some(&latest.sensor_data)
            );
        }
    }

    #[test]
    fn identical_seeds_reproduce_fleet() {
        let mut a = EquipmentRegistry::initialize(&specs(3), 42, clock()).unwrap();
        let mut b = EquipmentRegistry::initialize(&specs(3), 42, clock()).unwrap();
        for _ in 0..10 {
            a.tick();
            b.tick();
        }
        for (x, y) in a.list_all().zip(b.list_all()) {
            assert_eq!(x.health(), y.health());
            assert_eq!(x.rul(), y.rul());
            assert_eq!(x.last_reading(), y.last_reading());
        }
    }
}
