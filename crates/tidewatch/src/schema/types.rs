//! Core type definitions for the detected dataset schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name given to the risk column when the dataset has none.
pub const SYNTHETIC_TARGET: &str = "synthetic_risk_score";

/// Inferred kind of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Values coerce to finite numbers.
    Numeric,
    /// Free text or discrete labels.
    #[default]
    Categorical,
    /// Timestamp-like column (by name).
    DateTime,
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Zero-based position in the table.
    pub position: usize,
    /// Inferred kind.
    pub kind: ColumnKind,
    /// Number of non-missing values after coercion.
    pub non_missing: usize,
    /// Whether the name marks this column as a candidate predictor.
    #[serde(default)]
    pub is_feature: bool,
    /// Whether this column is the risk target.
    #[serde(default)]
    pub is_target: bool,
}

impl ColumnSchema {
    /// Create a new column schema with basic information.
    pub fn new(name: impl Into<String>, position: usize, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            position,
            kind,
            non_missing: 0,
            is_feature: false,
            is_target: false,
        }
    }
}

/// Where the risk target comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetOrigin {
    /// A keyword-matching numeric column of the input.
    Detected,
    /// Weighted normalized sum of feature columns, min-max scaled to [0, 1].
    Synthetic {
        /// Feature name to weight.
        weights: IndexMap<String, f64>,
    },
}

/// The column treated as the risk variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetColumn {
    pub name: String,
    pub origin: TargetOrigin,
}

impl TargetColumn {
    /// Whether the target is synthesized rather than read from the input.
    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, TargetOrigin::Synthetic { .. })
    }
}

/// Schema for an entire dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schemas for each input column, in table order.
    pub columns: Vec<ColumnSchema>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub datetime_columns: Vec<String>,
    /// Candidate predictor columns (numeric, keyword-matched).
    pub feature_columns: Vec<String>,
    pub target: TargetColumn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude_column: Option<String>,
    /// Rows inspected during detection.
    pub row_count: usize,
}

impl Schema {
    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get all column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The datetime column used for trend and temporal analysis.
    pub fn primary_datetime(&self) -> Option<&str> {
        self.datetime_columns.first().map(String::as_str)
    }

    /// Both coordinate columns, when present.
    pub fn coordinates(&self) -> Option<(&str, &str)> {
        match (&self.latitude_column, &self.longitude_column) {
            (Some(lat), Some(lon)) => Some((lat.as_str(), lon.as_str())),
            _ => None,
        }
    }

    /// Columns whose completeness matters for the quality score.
    pub fn key_columns(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.feature_columns.iter().map(String::as_str).collect();
        keys.extend(self.datetime_columns.iter().map(String::as_str));
        if !self.target.is_synthetic() {
            keys.push(self.target.name.as_str());
        }
        keys
    }
}
