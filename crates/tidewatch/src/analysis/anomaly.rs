//! Row-level anomaly detection with an isolation forest.
//!
//! Anomalous rows are the ones random axis-aligned partitions isolate
//! quickly. The forest is seeded, so the same matrix always yields the same
//! flags.

use serde::{Deserialize, Serialize};

use super::profile::outlier_mask;
use super::risk::percentage;
use crate::schema::{Frame, Schema};
use crate::stats;

/// Euler-Mascheroni constant, used by the average path length.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Representative anomalous rows kept in a report.
const MAX_REPORTED_RECORDS: usize = 10;

/// Label for a flagged row that is also an IQR outlier in some column.
pub const STATISTICAL_OUTLIER: &str = "Statistical Outlier";

/// Label for a flagged row with every value inside the IQR fences.
pub const PATTERN_DEVIATION: &str = "Pattern Deviation";

/// Anomaly section of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub total_anomalies: usize,
    /// Percentage of rows, rounded to two decimals.
    pub anomaly_rate: f64,
    /// First anomalous row indices, at most ten.
    pub anomalous_records: Vec<usize>,
    pub anomaly_types: Vec<String>,
    /// Numeric columns the forest was fitted on.
    pub columns: Vec<String>,
}

// =============================================================================
// ISOLATION FOREST
// =============================================================================

#[derive(Debug)]
enum IsolationTree {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    fn build(rows: &[&[f64]], depth_limit: usize, rng: &mut fastrand::Rng) -> Self {
        let width = rows.first().map_or(0, |r| r.len());
        if depth_limit == 0 || rows.len() <= 1 || width == 0 {
            return IsolationTree::External { size: rows.len() };
        }

        let feature = rng.usize(..width);
        let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r[feature]), hi.max(r[feature]))
        });
        if max - min <= f64::EPSILON {
            return IsolationTree::External { size: rows.len() };
        }

        let split = min + rng.f64() * (max - min);
        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().copied().partition(|r| r[feature] < split);
        if left.is_empty() || right.is_empty() {
            return IsolationTree::External { size: rows.len() };
        }

        IsolationTree::Internal {
            feature,
            split,
            left: Box::new(IsolationTree::build(&left, depth_limit - 1, rng)),
            right: Box::new(IsolationTree::build(&right, depth_limit - 1, rng)),
        }
    }

    fn path_length(&self, point: &[f64], depth: usize) -> f64 {
        match self {
            IsolationTree::External { size } => depth as f64 + average_path_length(*size),
            IsolationTree::Internal {
                feature,
                split,
                left,
                right,
            } => {
                if point[*feature] < *split {
                    left.path_length(point, depth + 1)
                } else {
                    right.path_length(point, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful binary search tree lookup.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// An ensemble of isolation trees fitted on a row-major matrix.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees, each on a subsample of at most `sample_size` rows
    /// drawn without replacement.
    pub fn fit(data: &[Vec<f64>], n_trees: usize, sample_size: usize, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let psi = sample_size.min(data.len());
        let depth_limit = (psi.max(2) as f64).log2().ceil() as usize;

        let mut indices: Vec<usize> = (0..data.len()).collect();
        let trees = (0..n_trees)
            .map(|_| {
                // Partial Fisher-Yates: the first psi slots become the sample
                for i in 0..psi {
                    let j = rng.usize(i..indices.len());
                    indices.swap(i, j);
                }
                let sample: Vec<&[f64]> = indices[..psi].iter().map(|&i| data[i].as_slice()).collect();
                IsolationTree::build(&sample, depth_limit, &mut rng)
            })
            .collect();

        Self {
            trees,
            sample_size: psi,
        }
    }

    /// Anomaly score in (0, 1] per row; higher is more anomalous.
    pub fn score(&self, data: &[Vec<f64>]) -> Vec<f64> {
        let c = average_path_length(self.sample_size);
        if self.trees.is_empty() || c <= 0.0 {
            return vec![0.0; data.len()];
        }

        data.iter()
            .map(|point| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(point, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2.0_f64.powf(-mean_path / c)
            })
            .collect()
    }
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Flags roughly the `contamination` share of least isolatable rows.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    contamination: f64,
    n_trees: usize,
    sample_size: usize,
    seed: u64,
}

impl AnomalyDetector {
    /// Detector with 10% contamination, 100 trees of 256 rows, seed 42.
    pub fn new() -> Self {
        Self {
            contamination: 0.1,
            n_trees: 100,
            sample_size: 256,
            seed: 42,
        }
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination.clamp(0.0, 0.5);
        self
    }

    pub fn with_forest(mut self, n_trees: usize, sample_size: usize, seed: u64) -> Self {
        self.n_trees = n_trees.max(1);
        self.sample_size = sample_size.max(2);
        self.seed = seed;
        self
    }

    /// Per-row anomaly flags over the given numeric columns, parallel to the
    /// frame's rows. Unknown and non-numeric columns are ignored; with no
    /// usable column nothing is flagged.
    pub fn detect(&self, frame: &Frame, columns: &[String]) -> Vec<bool> {
        let columns: Vec<String> = columns
            .iter()
            .filter(|c| frame.numeric(c).is_some())
            .cloned()
            .collect();
        if columns.is_empty() || frame.row_count() < 2 {
            return vec![false; frame.row_count()];
        }

        let matrix = frame.imputed_matrix(&columns);
        let forest = IsolationForest::fit(&matrix, self.n_trees, self.sample_size, self.seed);
        let scores = forest.score(&matrix);

        let threshold = stats::quantile(&stats::sorted(&scores), 1.0 - self.contamination);
        scores.iter().map(|&s| s > threshold).collect()
    }

    /// Run detection over every numeric column of the schema.
    pub fn analyze(&self, frame: &Frame, schema: &Schema) -> (AnomalyReport, Vec<bool>) {
        let flags = self.detect(frame, &schema.numeric_columns);
        let flagged: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect();

        let mut report = AnomalyReport {
            total_anomalies: flagged.len(),
            anomaly_rate: round2(percentage(flagged.len(), frame.row_count())),
            anomalous_records: flagged.iter().take(MAX_REPORTED_RECORDS).copied().collect(),
            anomaly_types: Vec::new(),
            columns: schema.numeric_columns.clone(),
        };

        if !flagged.is_empty() {
            report.anomaly_types = anomaly_types(frame, &schema.numeric_columns, &flagged);
        }

        tracing::debug!(
            anomalies = report.total_anomalies,
            rate = report.anomaly_rate,
            "detected anomalies"
        );

        (report, flags)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn anomaly_types(frame: &Frame, columns: &[String], flagged: &[usize]) -> Vec<String> {
    let masks: Vec<Vec<bool>> = columns
        .iter()
        .filter_map(|c| frame.numeric(c))
        .map(|values| outlier_mask(values, 1.5))
        .collect();

    let (mut statistical, mut pattern) = (false, false);
    for &row in flagged {
        if masks.iter().any(|mask| mask[row]) {
            statistical = true;
        } else {
            pattern = true;
        }
    }

    let mut types = Vec::new();
    if statistical {
        types.push(STATISTICAL_OUTLIER.to_string());
    }
    if pattern {
        types.push(PATTERN_DEVIATION.to_string());
    }
    types
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
