//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Health-correlated synthetic sensor telemetry."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use pdm_common::EquipmentCategory;
use rand::Rng;

use crate::degradation::MAX_HEALTH;
use crate::equipment::SensorValues;
use crate::profile::{profile, SensorRange};

/// Health factor below which readings become erratic.
pub const DEGRADED_HEALTH_FACTOR: f64 = 0.8;
/// Noise amplitude applied to healthy equipment.
pub const HEALTHY_NOISE: f64 = 0.02;
/// Gain applied to `1 - health_factor` on degraded equipment.
pub const DEGRADED_NOISE_GAIN: f64 = 0.3;

/// Relative noise amplitude for a machine at `health`.
pub fn noise_amplitude(health: f64) -> f64 {
    let health_factor = (health / MAX_HEALTH).clamp(0.0, 1.0);
    if health_factor < DEGRADED_HEALTH_FACTOR {
        (1.0 - health_factor) * DEGRADED_NOISE_GAIN
    } else {
        HEALTHY_NOISE
    }
}

/// Generates sensor vectors for a category at a given health.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetrySynthesizer;

impl TelemetrySynthesizer {
    pub fn synthesize<R: Rng + ?Sized>(
        category: EquipmentCategory,
        health: f64,
        rng: &mut R,
    ) -> SensorValues {
        let amplitude = noise_amplitude(health);
        profile(category)
            .sensors
            .iter()
            .map(|range| (range.sensor, Self::sample(range, amplitude, rng)))
            .collect()
    }

    fn sample<R: Rng + ?Sized>(range: &SensorRange, amplitude: f64, rng: &mut R) -> f64 {
        let base = rng.gen_range(range.min..=range.max);
        let spread = (amplitude * base).abs();
        let noisy = base + rng.gen_range(-spread..=spread);
        range.clamp(noisy)
    }
}
