//! Schema detection over columns of unknown name and type.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::input::DataTable;
use crate::schema::{
    parse_timestamp, ColumnKind, ColumnSchema, Schema, TargetColumn, TargetOrigin,
    SYNTHETIC_TARGET,
};

// =============================================================================
// NAME PATTERNS
// =============================================================================
// Case-insensitive substring matches on column names, compiled once.

static DATETIME_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(time|date|timestamp)").unwrap());

static FEATURE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(level|height|speed|pressure|temperature|humidity)").unwrap()
});

static TARGET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(risk|threat|danger|alert|score)").unwrap());

static LATITUDE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(lat|latitude)$").unwrap());

static LONGITUDE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(lon|lng|long|longitude)$").unwrap());

/// Classifies raw columns and picks (or synthesizes) the risk target.
pub struct SchemaDetector {
    /// Minimum share of non-missing values that must parse as numbers.
    numeric_threshold: f64,
}

impl SchemaDetector {
    /// Create a detector with default settings.
    pub fn new() -> Self {
        Self {
            numeric_threshold: 0.5,
        }
    }

    /// Detect the schema of a table. Never fails; an empty table yields a
    /// schema with no columns and an all-zero synthetic target.
    pub fn detect(&self, table: &DataTable) -> Schema {
        let mut columns = Vec::with_capacity(table.column_count());

        for (position, name) in table.columns.iter().enumerate() {
            let (kind, non_missing) = self.classify(table, name);
            let mut column = ColumnSchema::new(name.clone(), position, kind);
            column.non_missing = non_missing;
            column.is_feature = kind == ColumnKind::Numeric && FEATURE_NAME.is_match(name);
            columns.push(column);
        }

        let target_name = columns
            .iter()
            .find(|c| c.kind == ColumnKind::Numeric && TARGET_NAME.is_match(&c.name))
            .map(|c| c.name.clone());

        if let Some(ref name) = target_name {
            for column in columns.iter_mut().filter(|c| &c.name == name) {
                column.is_target = true;
                column.is_feature = false;
            }
        }

        let names_of = |kind: ColumnKind| -> Vec<String> {
            columns
                .iter()
                .filter(|c| c.kind == kind)
                .map(|c| c.name.clone())
                .collect()
        };
        let numeric_columns = names_of(ColumnKind::Numeric);
        let categorical_columns = names_of(ColumnKind::Categorical);
        let datetime_columns = names_of(ColumnKind::DateTime);

        let feature_columns: Vec<String> = columns
            .iter()
            .filter(|c| c.is_feature)
            .map(|c| c.name.clone())
            .collect();

        let target = match target_name {
            Some(name) => TargetColumn {
                name,
                origin: TargetOrigin::Detected,
            },
            None => TargetColumn {
                name: SYNTHETIC_TARGET.to_string(),
                origin: TargetOrigin::Synthetic {
                    weights: feature_columns
                        .iter()
                        .map(|f| (f.clone(), feature_weight(f)))
                        .collect::<IndexMap<_, _>>(),
                },
            },
        };

        let find_numeric = |pattern: &Regex| {
            numeric_columns
                .iter()
                .find(|c| pattern.is_match(c))
                .cloned()
        };
        let latitude_column = find_numeric(&LATITUDE_NAME);
        let longitude_column = find_numeric(&LONGITUDE_NAME);

        tracing::debug!(
            columns = columns.len(),
            numeric = numeric_columns.len(),
            features = feature_columns.len(),
            target = %target.name,
            synthetic = target.is_synthetic(),
            "detected schema"
        );

        Schema {
            columns,
            numeric_columns,
            categorical_columns,
            datetime_columns,
            feature_columns,
            target,
            latitude_column,
            longitude_column,
            row_count: table.row_count(),
        }
    }

    /// Decide a column's kind and count its usable values.
    fn classify(&self, table: &DataTable, name: &str) -> (ColumnKind, usize) {
        if DATETIME_NAME.is_match(name) {
            let parsed = table
                .column_values(name)
                .filter(|v| parse_timestamp(v).is_some())
                .count();
            return (ColumnKind::DateTime, parsed);
        }

        let mut non_missing = 0usize;
        let mut numeric = 0usize;
        for value in table.column_values(name) {
            if value.is_missing() {
                continue;
            }
            non_missing += 1;
            if value.as_f64().is_some() {
                numeric += 1;
            }
        }

        if numeric > 0 && numeric as f64 >= non_missing as f64 * self.numeric_threshold {
            (ColumnKind::Numeric, numeric)
        } else {
            (ColumnKind::Categorical, non_missing)
        }
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic weight in [0.5, 1.0] derived from a feature's name.
pub fn feature_weight(name: &str) -> f64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let fraction = u64::from_be_bytes(bytes) as f64 / u64::MAX as f64;
    0.5 + 0.5 * fraction
}
