//! Weighted data-quality score.

use serde::{Deserialize, Serialize};

use crate::input::DataTable;
use crate::schema::{Frame, Schema};
use crate::stats;

const COMPLETENESS_WEIGHT: f64 = 0.40;
const UNIQUENESS_WEIGHT: f64 = 0.25;
const VALIDITY_WEIGHT: f64 = 0.20;
const CONSISTENCY_WEIGHT: f64 = 0.15;

/// Components of the quality score, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub completeness: f64,
    pub uniqueness: f64,
    pub validity: f64,
    pub consistency: f64,
    /// Points subtracted after weighting.
    pub penalty: f64,
    /// Final score in [0, 100].
    pub score: f64,
}

pub struct QualityScorer {
    /// Tables with fewer rows are penalized.
    min_rows: usize,
    /// Penalty applied per triggered rule.
    penalty: f64,
    /// IQR multiplier for the validity fences.
    validity_multiplier: f64,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self {
            min_rows: 50,
            penalty: 10.0,
            validity_multiplier: 3.0,
        }
    }

    pub fn score(&self, table: &DataTable, frame: &Frame, schema: &Schema) -> QualityBreakdown {
        let rows = table.row_count();
        let cells = rows * table.column_count();
        if cells == 0 {
            return QualityBreakdown::default();
        }

        let completeness = 1.0 - table.missing_cells() as f64 / cells as f64;
        let uniqueness = 1.0 - table.duplicate_row_count() as f64 / rows as f64;
        let validity = self.validity(frame, schema);
        let consistency = consistency(frame, schema);

        let mut penalty = 0.0;
        if rows < self.min_rows {
            penalty += self.penalty;
        }
        if has_sparse_key_column(frame, schema, rows) {
            penalty += self.penalty;
        }

        let weighted = 100.0
            * (COMPLETENESS_WEIGHT * completeness
                + UNIQUENESS_WEIGHT * uniqueness
                + VALIDITY_WEIGHT * validity
                + CONSISTENCY_WEIGHT * consistency);
        let score = ((weighted - penalty).clamp(0.0, 100.0) * 10.0).round() / 10.0;

        tracing::debug!(score, completeness, uniqueness, validity, consistency, "scored quality");

        QualityBreakdown {
            completeness,
            uniqueness,
            validity,
            consistency,
            penalty,
            score,
        }
    }

    /// Share of numeric values inside wide IQR fences.
    fn validity(&self, frame: &Frame, schema: &Schema) -> f64 {
        let (mut total, mut valid) = (0usize, 0usize);

        for column in &schema.numeric_columns {
            let Some(values) = frame.numeric(column) else {
                continue;
            };
            let present = stats::present(values);
            total += present.len();
            if present.len() < 4 {
                valid += present.len();
                continue;
            }
            let (lo, hi) = stats::iqr_fences(&stats::sorted(&present), self.validity_multiplier);
            valid += present.iter().filter(|&&v| v >= lo && v <= hi).count();
        }

        if total == 0 { 1.0 } else { valid as f64 / total as f64 }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Regularity of timestamp deltas: `1 / (1 + cv)` of the sorted gaps.
fn consistency(frame: &Frame, schema: &Schema) -> f64 {
    let Some(times) = schema.primary_datetime().and_then(|c| frame.datetime(c)) else {
        return 1.0;
    };
    let mut times: Vec<_> = times.iter().flatten().copied().collect();
    if times.len() < 3 {
        return 1.0;
    }
    times.sort();

    let deltas: Vec<f64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64)
        .collect();
    1.0 / (1.0 + stats::coefficient_of_variation(&deltas))
}

fn has_sparse_key_column(frame: &Frame, schema: &Schema, rows: usize) -> bool {
    schema.key_columns().into_iter().any(|column| {
        let present = frame
            .numeric(column)
            .map(|v| v.iter().flatten().count())
            .or_else(|| frame.datetime(column).map(|v| v.iter().flatten().count()));
        present.is_some_and(|present| (rows - present) as f64 > rows as f64 / 2.0)
    })
}
