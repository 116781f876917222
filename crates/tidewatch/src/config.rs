//! Engine configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidewatchError};

/// Tunable constants of the analysis engine.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides:
///
/// ```
/// # use tidewatch::EngineConfig;
/// let config: EngineConfig = serde_json::from_str(r#"{"forest_trees": 50}"#).unwrap();
/// assert_eq!(config.forest_trees, 50);
/// assert_eq!(config.contamination, 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Expected share of anomalous rows.
    pub contamination: f64,

    /// Trees in the isolation forest.
    pub forest_trees: usize,

    /// Rows subsampled per tree.
    pub forest_sample_size: usize,

    /// Seed of the isolation forest.
    pub forest_seed: u64,

    /// Fewest predictions generated.
    pub min_predictions: usize,

    /// Most predictions generated.
    pub max_predictions: usize,

    /// Alerts at or above this risk score become risk events.
    pub alert_threshold: f64,

    /// Maximum insights in a result.
    pub max_insights: usize,

    /// Maximum recommendations in a result.
    pub max_recommendations: usize,

    /// Results kept by the in-memory store.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            forest_trees: 100,
            forest_sample_size: 256,
            forest_seed: 42,
            min_predictions: 6,
            max_predictions: 24,
            alert_threshold: 0.7,
            max_insights: 5,
            max_recommendations: 5,
            cache_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TidewatchError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EngineConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            TidewatchError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=0.5).contains(&self.contamination) {
            return Err(TidewatchError::Config(format!(
                "contamination must be in [0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.forest_trees == 0 || self.forest_sample_size < 2 {
            return Err(TidewatchError::Config(
                "forest needs at least one tree and a sample size of two".to_string(),
            ));
        }
        if self.min_predictions == 0 || self.min_predictions > self.max_predictions {
            return Err(TidewatchError::Config(format!(
                "invalid prediction bounds {}..={}",
                self.min_predictions, self.max_predictions
            )));
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(TidewatchError::Config(format!(
                "alert_threshold must be in [0, 1], got {}",
                self.alert_threshold
            )));
        }
        Ok(())
    }
}
