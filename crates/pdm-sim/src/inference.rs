//! ---
//! pdm_section: "11-simulation"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Input preparation and ensemble seam for external RUL models."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
//! Trained models live outside this crate. They are plugged in through
//! [`RulPredictor`]; this module only shapes the feature vector and combines
//! the individual predictions.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::equipment::SensorValues;
use crate::errors::FleetError;

/// Feature width expected by the regression models.
pub const MODEL_FEATURES: usize = 21;
/// Minimum number of numeric readings accepted for a prediction.
pub const MIN_SENSOR_VALUES: usize = 5;

/// External regression model mapping a feature vector to remaining cycles.
pub trait RulPredictor: Send + Sync {
    fn model_id(&self) -> &str;
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

/// Zero-padded or truncated feature vector ready for a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInput {
    pub features: Vec<f64>,
    pub sensors_used: Vec<String>,
}

impl ModelInput {
    /// Build from named readings in their supplied order.
    pub fn from_pairs<I, S>(readings: I) -> Result<Self, FleetError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (sensors_used, mut features): (Vec<String>, Vec<f64>) = readings
            .into_iter()
            .filter(|(_, value)| value.is_finite())
            .map(|(name, value)| (name.into(), value))
            .unzip();
        if features.len() < MIN_SENSOR_VALUES {
            return Err(FleetError::InsufficientSensors {
                provided: features.len(),
                required: MIN_SENSOR_VALUES,
            });
        }
        features.resize(MODEL_FEATURES, 0.0);
        Ok(Self {
            features,
            sensors_used,
        })
    }

    pub fn from_values(values: &SensorValues) -> Result<Self, FleetError> {
        Self::from_pairs(values.iter().map(|(sensor, value)| (sensor.to_string(), *value)))
    }
}

/// Per-model outputs plus the combined estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub predictions: IndexMap<String, Option<u64>>,
    pub ensemble_prediction: Option<u64>,
    pub sensors_used: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Run every predictor; failed models are reported as `None` and excluded from the mean.
pub fn run_ensemble(
    predictors: &[Arc<dyn RulPredictor>],
    input: &ModelInput,
    timestamp: DateTime<Utc>,
) -> PredictionReport {
    let mut predictions = IndexMap::with_capacity(predictors.len());
    for predictor in predictors {
        let outcome = match predictor.predict(&input.features) {
            Ok(value) if value.is_finite() => Some(value.max(0.0).floor() as u64),
            Ok(value) => {
                warn!(model = predictor.model_id(), value, "model returned non-finite prediction");
                None
            }
            Err(err) => {
                warn!(model = predictor.model_id(), error = %err, "model prediction failed");
                None
            }
        };
        predictions.insert(predictor.model_id().to_owned(), outcome);
    }
    // Averaged in f64 so saturated per-model values cannot overflow the sum.
    let successful: Vec<f64> = predictions.values().flatten().map(|&v| v as f64).collect();
    let ensemble_prediction = if successful.is_empty() {
        None
    } else {
        let mean = successful.iter().sum::<f64>() / successful.len() as f64;
        Some(mean.floor() as u64)
    };
    PredictionReport {
        predictions,
        ensemble_prediction,
        sensors_used: input.sensors_used.clone(),
        timestamp,
    }
}
