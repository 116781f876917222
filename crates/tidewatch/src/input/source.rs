//! Raw table representation and source metadata.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, TidewatchError};

/// Metadata about a parsed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was parsed.
    pub parsed_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been parsed.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            parsed_at: Utc::now(),
        }
    }
}

/// An untyped cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

static NULL: Scalar = Scalar::Null;

impl Scalar {
    /// Check if a string represents a missing/null value.
    pub fn is_null_text(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nil")
            || trimmed == "."
            || trimmed == "-"
    }

    /// Build a cell from raw parser text, mapping NA spellings to `Null`.
    pub fn from_text(value: &str) -> Self {
        if Self::is_null_text(value) {
            Scalar::Null
        } else {
            Scalar::Text(value.to_string())
        }
    }

    /// Whether this cell counts as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Number(n) => !n.is_finite(),
            Scalar::Text(s) => Self::is_null_text(s),
            Scalar::Bool(_) => false,
        }
    }

    /// Numeric coercion. Non-finite values coerce to `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Number(n) => *n,
            Scalar::Bool(b) => f64::from(u8::from(*b)),
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Text rendering for categorical use. Missing cells yield `None`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Scalar::Text(s) => Some(s.trim().to_string()),
            Scalar::Number(n) => Some(n.to_string()),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Null => None,
        }
    }
}

impl From<serde_json::Value> for Scalar {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
            serde_json::Value::String(s) => Scalar::from_text(&s),
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::from_text(value)
    }
}

/// A single row, keyed by column name.
pub type Record = IndexMap<String, Scalar>;

/// Tabular data of unknown shape.
///
/// Every row holds every column; columns absent from an input record are
/// filled with `Scalar::Null` so that downstream code never has to
/// distinguish "absent" from "missing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    /// Column names in first-appearance order.
    pub columns: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Record>,
}

impl DataTable {
    /// Build a table from records that may carry different key sets.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| (c.clone(), record.shift_remove(c).unwrap_or(Scalar::Null)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Build a table from a header row and a string grid.
    ///
    /// Repeated headers are suffixed (`a`, `a_2`, `a_3`) so every column
    /// keeps its own values.
    pub fn from_grid(headers: Vec<String>, grid: Vec<Vec<String>>) -> Self {
        let headers = unique_headers(headers);
        let rows = grid
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        let cell = row.get(i).map_or(Scalar::Null, |v| Scalar::from_text(v));
                        (h.clone(), cell)
                    })
                    .collect()
            })
            .collect();

        Self {
            columns: headers,
            rows,
        }
    }

    /// Build a table from a JSON array of objects.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Array(items) = value else {
            return Err(TidewatchError::MalformedInput(
                "expected a JSON array of row objects".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let serde_json::Value::Object(map) = item else {
                return Err(TidewatchError::MalformedInput(format!(
                    "row {} is not an object",
                    index
                )));
            };
            records.push(map.into_iter().map(|(k, v)| (k, Scalar::from(v))).collect());
        }

        Ok(Self::from_records(records))
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Get all values for a column by name, in row order.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Scalar> + 'a {
        self.rows.iter().map(move |row| row.get(name).unwrap_or(&NULL))
    }

    /// Number of missing cells over the whole table.
    pub fn missing_cells(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.values().filter(|v| v.is_missing()).count())
            .sum()
    }

    /// Number of rows that repeat an earlier row exactly.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.canonical_rows()
            .into_iter()
            .filter(|row| !seen.insert(row.clone()))
            .count()
    }

    /// Stable structural hash of the table's content.
    ///
    /// Each row is serialized with its keys sorted, and the serialized rows
    /// are sorted before hashing, so neither column order nor row order
    /// affects the result.
    pub fn content_hash(&self) -> String {
        let mut rows = self.canonical_rows();
        rows.sort();

        let mut hasher = Sha256::new();
        for row in &rows {
            hasher.update(row.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    /// Hash of the rows in their current order.
    ///
    /// Unlike [`content_hash`](Self::content_hash) this changes when rows
    /// are reordered, which matters for anything indexed by row position.
    pub fn row_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for row in self.canonical_rows() {
            hasher.update(row.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    fn canonical_rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                let sorted: BTreeMap<&str, &Scalar> =
                    row.iter().map(|(k, v)| (k.as_str(), v)).collect();
                serde_json::to_string(&sorted).unwrap_or_default()
            })
            .collect()
    }
}

/// Suffix repeated names until every header is distinct.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|header| {
            let mut name = header.clone();
            let mut n = 2;
            while seen.contains(&name) {
                name = format!("{}_{}", header, n);
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}
