//! Typed, column-oriented view of a table under a detected schema.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::time::parse_timestamp;
use super::types::{ColumnKind, Schema, TargetOrigin};
use crate::error::{Result, TidewatchError};
use crate::input::DataTable;
use crate::stats;

/// Coerced column data for one analysis call.
///
/// Built once from the raw table and threaded through every component.
/// The synthetic target, when the schema asks for one, lives only here.
#[derive(Debug, Clone)]
pub struct Frame {
    row_count: usize,
    numeric: IndexMap<String, Vec<Option<f64>>>,
    datetime: IndexMap<String, Vec<Option<DateTime<Utc>>>>,
    categorical: IndexMap<String, Vec<Option<String>>>,
    target: Vec<Option<f64>>,
}

impl Frame {
    /// Coerce `table` according to `schema`.
    ///
    /// Fails only when the schema names a column the table does not have.
    pub fn build(table: &DataTable, schema: &Schema) -> Result<Self> {
        let mut numeric = IndexMap::new();
        let mut datetime = IndexMap::new();
        let mut categorical = IndexMap::new();

        for column in &schema.columns {
            if !table.has_column(&column.name) {
                return Err(TidewatchError::SchemaMismatch(format!(
                    "column '{}' is not present in the table",
                    column.name
                )));
            }

            let values = table.column_values(&column.name);
            match column.kind {
                ColumnKind::Numeric => {
                    numeric.insert(column.name.clone(), values.map(|v| v.as_f64()).collect());
                }
                ColumnKind::DateTime => {
                    datetime.insert(column.name.clone(), values.map(parse_timestamp).collect());
                }
                ColumnKind::Categorical => {
                    categorical.insert(column.name.clone(), values.map(|v| v.as_text()).collect());
                }
            }
        }

        let row_count = table.row_count();
        let target = match &schema.target.origin {
            TargetOrigin::Detected => numeric.get(&schema.target.name).cloned().ok_or_else(|| {
                TidewatchError::SchemaMismatch(format!(
                    "target '{}' is not a numeric column",
                    schema.target.name
                ))
            })?,
            TargetOrigin::Synthetic { weights } => synthesize_target(&numeric, weights, row_count),
        };

        Ok(Self {
            row_count,
            numeric,
            datetime,
            categorical,
            target,
        })
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Values of a numeric column.
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.numeric.get(name).map(Vec::as_slice)
    }

    /// Values of a datetime column.
    pub fn datetime(&self, name: &str) -> Option<&[Option<DateTime<Utc>>]> {
        self.datetime.get(name).map(Vec::as_slice)
    }

    /// Values of a categorical column.
    pub fn categorical(&self, name: &str) -> Option<&[Option<String>]> {
        self.categorical.get(name).map(Vec::as_slice)
    }

    /// Values of the risk target, real or synthetic.
    pub fn target(&self) -> &[Option<f64>] {
        &self.target
    }

    /// Matrix of the given numeric columns with missing values imputed by
    /// the column mean (0 for all-missing columns). One inner vec per row.
    pub fn imputed_matrix(&self, columns: &[String]) -> Vec<Vec<f64>> {
        let filled: Vec<Vec<f64>> = columns
            .iter()
            .filter_map(|name| self.numeric(name))
            .map(|values| {
                let mean = stats::mean(&stats::present(values));
                values.iter().map(|v| v.unwrap_or(mean)).collect()
            })
            .collect();

        (0..self.row_count)
            .map(|row| filled.iter().map(|col| col[row]).collect())
            .collect()
    }
}

/// Weighted sum of min-max normalized features, itself min-max normalized.
///
/// Missing feature values are imputed with the feature mean. Constant or
/// all-missing features contribute nothing; a constant sum yields zeros.
fn synthesize_target(
    numeric: &IndexMap<String, Vec<Option<f64>>>,
    weights: &IndexMap<String, f64>,
    row_count: usize,
) -> Vec<Option<f64>> {
    let mut score = vec![0.0; row_count];

    for (feature, weight) in weights {
        let Some(values) = numeric.get(feature) else {
            continue;
        };
        let present = stats::present(values);
        if present.is_empty() {
            continue;
        }

        let mean = stats::mean(&present);
        let (min, max) = stats::min_max(&present);
        if max - min <= 0.0 {
            continue;
        }

        for (acc, value) in score.iter_mut().zip(values) {
            *acc += weight * (value.unwrap_or(mean) - min) / (max - min);
        }
    }

    let (min, max) = stats::min_max(&score);
    let range = max - min;
    score
        .into_iter()
        .map(|v| Some(if range > 0.0 { (v - min) / range } else { 0.0 }))
        .collect()
}
