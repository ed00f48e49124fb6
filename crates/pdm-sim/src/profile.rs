//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Per-category sensor ranges and lifespan constants."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use pdm_common::EquipmentCategory;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use self::SensorKind::*;

/// Physical sensor channels reported by plant equipment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Vibration,
    Pressure,
    Current,
    Voltage,
    Speed,
    FlowRate,
}

impl SensorKind {
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Vibration => "mm/s",
            SensorKind::Pressure => "bar",
            SensorKind::Current => "A",
            SensorKind::Voltage => "V",
            SensorKind::Speed => "RPM",
            SensorKind::FlowRate => "L/min",
        }
    }
}

/// Declared physical range for one sensor on one category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRange {
    pub sensor: SensorKind,
    pub min: f64,
    pub max: f64,
}

impl SensorRange {
    const fn new(sensor: SensorKind, min: f64, max: f64) -> Self {
        Self { sensor, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Static telemetry and lifespan profile of an equipment category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryProfile {
    pub category: EquipmentCategory,
    pub sensors: &'static [SensorRange],
    pub rated_life_hours: u32,
}

impl CategoryProfile {
    pub fn range(&self, sensor: SensorKind) -> Option<&SensorRange> {
        self.sensors.iter().find(|range| range.sensor == sensor)
    }
}

const OVEN_SENSORS: &[SensorRange] = &[
    SensorRange::new(Temperature, 180.0, 220.0),
    SensorRange::new(Humidity, 20.0, 40.0),
    SensorRange::new(Pressure, 1.0, 2.0),
    SensorRange::new(Current, 15.0, 35.0),
    SensorRange::new(Voltage, 400.0, 480.0),
];

const MIXER_SENSORS: &[SensorRange] = &[
    SensorRange::new(Temperature, 25.0, 35.0),
    SensorRange::new(Vibration, 0.5, 2.0),
    SensorRange::new(Current, 20.0, 40.0),
    SensorRange::new(Voltage, 400.0, 480.0),
    SensorRange::new(Speed, 200.0, 800.0),
];

const CONVEYOR_SENSORS: &[SensorRange] = &[
    SensorRange::new(Temperature, 20.0, 30.0),
    SensorRange::new(Vibration, 0.2, 1.5),
    SensorRange::new(Current, 8.0, 20.0),
    SensorRange::new(Voltage, 200.0, 400.0),
    SensorRange::new(Speed, 50.0, 150.0),
];

const DISPENSER_SENSORS: &[SensorRange] = &[
    SensorRange::new(Temperature, 20.0, 40.0),
    SensorRange::new(Humidity, 30.0, 60.0),
    SensorRange::new(Vibration, 0.1, 1.0),
    SensorRange::new(Pressure, 0.5, 5.0),
    SensorRange::new(Current, 10.0, 30.0),
    SensorRange::new(Voltage, 200.0, 480.0),
    SensorRange::new(Speed, 100.0, 1000.0),
    SensorRange::new(FlowRate, 50.0, 150.0),
];

const GENERIC_SENSORS: &[SensorRange] = &[
    SensorRange::new(Temperature, 20.0, 40.0),
    SensorRange::new(Humidity, 30.0, 60.0),
    SensorRange::new(Vibration, 0.1, 1.0),
    SensorRange::new(Pressure, 0.5, 5.0),
    SensorRange::new(Current, 10.0, 30.0),
    SensorRange::new(Voltage, 200.0, 480.0),
    SensorRange::new(Speed, 100.0, 1000.0),
];

const HIGH_HEAT_LIFE_HOURS: u32 = 8_760;
const MOVING_PARTS_LIFE_HOURS: u32 = 17_520;
const STANDARD_LIFE_HOURS: u32 = 13_140;

static OVEN: CategoryProfile = CategoryProfile {
    category: EquipmentCategory::Oven,
    sensors: OVEN_SENSORS,
    rated_life_hours: HIGH_HEAT_LIFE_HOURS,
};

static MIXER: CategoryProfile = CategoryProfile {
    category: EquipmentCategory::Mixer,
    sensors: MIXER_SENSORS,
    rated_life_hours: STANDARD_LIFE_HOURS,
};

static CONVEYOR: CategoryProfile = CategoryProfile {
    category: EquipmentCategory::Conveyor,
    sensors: CONVEYOR_SENSORS,
    rated_life_hours: MOVING_PARTS_LIFE_HOURS,
};

static DISPENSER: CategoryProfile = CategoryProfile {
    category: EquipmentCategory::Dispenser,
    sensors: DISPENSER_SENSORS,
    rated_life_hours: STANDARD_LIFE_HOURS,
};

static GENERIC: CategoryProfile = CategoryProfile {
    category: EquipmentCategory::Generic,
    sensors: GENERIC_SENSORS,
    rated_life_hours: STANDARD_LIFE_HOURS,
};

/// Look up the static profile for a category.
pub fn profile(category: EquipmentCategory) -> &'static CategoryProfile {
    match category {
        EquipmentCategory::Oven => &OVEN,
        EquipmentCategory::Mixer => &MIXER,
        EquipmentCategory::Conveyor => &CONVEYOR,
        EquipmentCategory::Dispenser => &DISPENSER,
        EquipmentCategory::Generic => &GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_range_is_well_formed() {
        for category in EquipmentCategory::iter() {
            let profile = profile(category);
            assert_eq!(profile.category, category);
            assert!(!profile.sensors.is_empty());
            for range in profile.sensors {
                assert!(range.min > 0.0 && range.min <= range.max, "{category}: {range:?}");
            }
        }
    }

    #[test]
    fn flow_rate_only_on_liquid_handling() {
        for category in EquipmentCategory::iter() {
            let has_flow = profile(category).range(SensorKind::FlowRate).is_some();
            assert_eq!(has_flow, category.is_liquid_handling(), "{category}");
        }
    }

    #[test]
    fn high_heat_equipment_has_shortest_life() {
        assert_eq!(profile(EquipmentCategory::Oven).rated_life_hours, 8_760);
        assert_eq!(profile(EquipmentCategory::Conveyor).rated_life_hours, 17_520);
        assert_eq!(profile(EquipmentCategory::Mixer).rated_life_hours, 13_140);
    }
}
