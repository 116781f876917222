//! Deterministic short-horizon risk predictions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schema::{Frame, Schema};
use crate::stats;

/// Minutes between consecutive forecast horizons.
const HORIZON_STEP_MINUTES: usize = 30;

/// Half-width of the uncertainty band, as a fraction of the value.
const UNCERTAINTY: f64 = 0.15;

/// Per-step upward drift, as a fraction of the target's standard deviation.
const DRIFT: f64 = 0.01;

/// Contributing feature columns named per prediction.
const MAX_FEATURES: usize = 5;

/// A single forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `pred_1`, `pred_2`, ...
    pub prediction_id: String,
    /// Bounded to the target's observed range.
    pub predicted_value: f64,
    /// In [0.6, 0.95].
    pub confidence: f64,
    /// e.g. "30 minutes"
    pub time_horizon: String,
    pub prediction_type: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub features_used: Vec<String>,
}

/// Seed for the forecast RNG: the first eight bytes of
/// `SHA-256(content_hash || dataset_id)`.
pub fn forecast_seed(content_hash: &str, dataset_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(dataset_id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Generates a bounded, seeded set of predictions around the target mean.
pub struct ForecastGenerator {
    min_predictions: usize,
    max_predictions: usize,
}

impl ForecastGenerator {
    pub fn new() -> Self {
        Self {
            min_predictions: 6,
            max_predictions: 24,
        }
    }

    /// Override the prediction count bounds.
    pub fn with_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_predictions = min.max(1);
        self.max_predictions = max.max(self.min_predictions);
        self
    }

    /// Number of predictions for a table of `rows` rows.
    pub fn prediction_count(&self, rows: usize) -> usize {
        (rows / 10).clamp(self.min_predictions, self.max_predictions)
    }

    pub fn generate(&self, frame: &Frame, schema: &Schema, seed: u64) -> Vec<Prediction> {
        let target = stats::present(frame.target());
        let mean = stats::mean(&target);
        let std = stats::std_dev(&target);
        let variance = stats::variance(&target);
        let (min, max) = stats::min_max(&target);

        let size_factor = ((1.0 + target.len() as f64).ln() / 1001_f64.ln()).min(1.0);
        let base_confidence = 0.6 + 0.35 * size_factor - 0.5 * variance;
        let features = features_used(schema);

        let mut rng = fastrand::Rng::with_seed(seed);
        let count = self.prediction_count(frame.row_count());

        let predictions: Vec<Prediction> = (0..count)
            .map(|i| {
                let step = (i + 1) as f64;
                let noise = (rng.f64() - 0.5) * std;
                let value = (mean + DRIFT * std * step + noise).clamp(min, max);
                let (lower, upper) = ordered(value * (1.0 - UNCERTAINTY), value * (1.0 + UNCERTAINTY));

                Prediction {
                    prediction_id: format!("pred_{}", i + 1),
                    predicted_value: value,
                    confidence: (base_confidence - 0.005 * i as f64).clamp(0.6, 0.95),
                    time_horizon: format!("{} minutes", HORIZON_STEP_MINUTES * (i + 1)),
                    prediction_type: "risk_assessment".to_string(),
                    lower_bound: lower,
                    upper_bound: upper,
                    features_used: features.clone(),
                }
            })
            .collect();

        tracing::debug!(count = predictions.len(), seed, "generated predictions");
        predictions
    }
}

impl Default for ForecastGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn features_used(schema: &Schema) -> Vec<String> {
    let source = if schema.feature_columns.is_empty() {
        schema
            .numeric_columns
            .iter()
            .filter(|c| **c != schema.target.name)
            .cloned()
            .collect()
    } else {
        schema.feature_columns.clone()
    };
    source.into_iter().take(MAX_FEATURES).collect()
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}
