//! Per-column summary statistics, pairwise correlations and IQR outliers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{Frame, Schema};
use crate::stats;

/// Columns with fewer values than this never report outliers.
const MIN_OUTLIER_VALUES: usize = 4;

/// Summary of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Non-missing values.
    pub count: usize,
    /// Missing values.
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,
    pub has_outliers: bool,
    pub outlier_count: usize,
}

/// A frequent value of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Summary of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub missing: usize,
    pub unique_count: usize,
    /// Most frequent values, highest count first.
    pub top_values: Vec<ValueCount>,
}

/// Qualitative label for a correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
    Negligible,
}

impl CorrelationStrength {
    /// Label a coefficient by its magnitude.
    pub fn from_coefficient(r: f64) -> Self {
        match r.abs() {
            a if a >= 0.7 => CorrelationStrength::Strong,
            a if a >= 0.4 => CorrelationStrength::Moderate,
            a if a >= 0.2 => CorrelationStrength::Weak,
            _ => CorrelationStrength::Negligible,
        }
    }
}

/// Correlation between an unordered pair of numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub column_a: String,
    pub column_b: String,
    pub coefficient: f64,
    pub strength: CorrelationStrength,
    /// Rows where both columns are present.
    pub sample_size: usize,
}

/// Statistical profile of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub numeric: IndexMap<String, NumericSummary>,
    pub categorical: IndexMap<String, CategoricalSummary>,
    /// Defined correlations only; zero-variance pairs are omitted.
    pub correlations: Vec<Correlation>,
}

/// Computes the statistical profile.
pub struct Profiler {
    /// Outlier fence multiplier for the IQR rule.
    iqr_multiplier: f64,
    /// Most frequent values kept per categorical column.
    top_values: usize,
}

impl Profiler {
    /// Create a profiler with default settings.
    pub fn new() -> Self {
        Self {
            iqr_multiplier: 1.5,
            top_values: 5,
        }
    }

    /// Profile every numeric and categorical column of the frame.
    pub fn profile(&self, frame: &Frame, schema: &Schema) -> StatisticalSummary {
        let mut summary = StatisticalSummary::default();

        for name in &schema.numeric_columns {
            let Some(values) = frame.numeric(name) else {
                continue;
            };
            if let Some(numeric) = self.summarize_numeric(values) {
                summary.numeric.insert(name.clone(), numeric);
            }
        }

        for name in &schema.categorical_columns {
            if let Some(values) = frame.categorical(name) {
                summary
                    .categorical
                    .insert(name.clone(), self.summarize_categorical(values));
            }
        }

        summary.correlations = correlations(frame, &schema.numeric_columns);
        summary
    }

    /// Summary of a numeric column; `None` when it has no values.
    pub fn summarize_numeric(&self, values: &[Option<f64>]) -> Option<NumericSummary> {
        let present = stats::present(values);
        if present.is_empty() {
            return None;
        }

        let sorted = stats::sorted(&present);
        let (min, max) = stats::min_max(&present);
        let outlier_count = count_outliers(&sorted, self.iqr_multiplier);

        Some(NumericSummary {
            count: present.len(),
            missing: values.len() - present.len(),
            mean: stats::mean(&present),
            median: stats::quantile(&sorted, 0.5),
            std: stats::std_dev(&present),
            min,
            max,
            q1: stats::quantile(&sorted, 0.25),
            q3: stats::quantile(&sorted, 0.75),
            skewness: stats::skewness(&present),
            kurtosis: stats::kurtosis(&present),
            has_outliers: outlier_count > 0,
            outlier_count,
        })
    }

    fn summarize_categorical(&self, values: &[Option<String>]) -> CategoricalSummary {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }

        let count = counts.values().sum();
        let unique_count = counts.len();

        // Stable sort keeps first-seen order among ties
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        CategoricalSummary {
            count,
            missing: values.len() - count,
            unique_count,
            top_values: ranked
                .into_iter()
                .take(self.top_values)
                .map(|(value, count)| ValueCount {
                    value: value.to_string(),
                    count,
                })
                .collect(),
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Pairwise correlations over overlapping non-missing values.
fn correlations(frame: &Frame, columns: &[String]) -> Vec<Correlation> {
    let mut out = Vec::new();

    for (i, a) in columns.iter().enumerate() {
        for b in &columns[i + 1..] {
            let (Some(va), Some(vb)) = (frame.numeric(a), frame.numeric(b)) else {
                continue;
            };
            let (x, y) = stats::paired(va, vb);
            if let Some(r) = stats::pearson(&x, &y) {
                out.push(Correlation {
                    column_a: a.clone(),
                    column_b: b.clone(),
                    coefficient: r,
                    strength: CorrelationStrength::from_coefficient(r),
                    sample_size: x.len(),
                });
            }
        }
    }

    out
}

fn count_outliers(sorted: &[f64], multiplier: f64) -> usize {
    if sorted.len() < MIN_OUTLIER_VALUES {
        return 0;
    }
    let (lo, hi) = stats::iqr_fences(sorted, multiplier);
    sorted.iter().filter(|&&v| v < lo || v > hi).count()
}

/// Per-row IQR outlier flags for one column. Missing values and columns
/// with fewer than four values are never flagged.
pub fn outlier_mask(values: &[Option<f64>], multiplier: f64) -> Vec<bool> {
    let sorted = stats::sorted(&stats::present(values));
    if sorted.len() < MIN_OUTLIER_VALUES {
        return vec![false; values.len()];
    }
    let (lo, hi) = stats::iqr_fences(&sorted, multiplier);
    values
        .iter()
        .map(|v| v.is_some_and(|v| v < lo || v > hi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DataTable;
    use crate::inference::SchemaDetector;
    use serde_json::json;

    fn profile(value: serde_json::Value) -> StatisticalSummary {
        let table = DataTable::from_json(value).unwrap();
        let schema = SchemaDetector::new().detect(&table);
        let frame = Frame::build(&table, &schema).unwrap();
        Profiler::new().profile(&frame, &schema)
    }

    #[test]
    fn test_numeric_summary() {
        let summary = Profiler::new()
            .summarize_numeric(&[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)])
            .unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert!(!summary.has_outliers);
    }

    #[test]
    fn test_single_value_column() {
        let summary = Profiler::new().summarize_numeric(&[Some(5.0)]).unwrap();
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.skewness, 0.0);
        assert!(!summary.has_outliers);
        assert!(Profiler::new().summarize_numeric(&[None, None]).is_none());
    }

    #[test]
    fn test_few_values_have_no_outliers() {
        let summary = Profiler::new()
            .summarize_numeric(&[Some(1.0), Some(1.0), Some(1000.0)])
            .unwrap();
        assert!(!summary.has_outliers);
    }

    #[test]
    fn test_outlier_detected() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 3) as f64)).collect();
        values.push(Some(500.0));

        let summary = Profiler::new().summarize_numeric(&values).unwrap();
        assert!(summary.has_outliers);
        assert_eq!(summary.outlier_count, 1);

        let mask = outlier_mask(&values, 1.5);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
        assert!(mask[20]);
    }

    #[test]
    fn test_correlations_omit_constant_columns() {
        let summary = profile(json!([
            {"a": 1.0, "b": 2.0, "c": 5.0},
            {"a": 2.0, "b": 4.1, "c": 5.0},
            {"a": 3.0, "b": 5.9, "c": 5.0},
        ]));

        assert_eq!(summary.correlations.len(), 1);
        let corr = &summary.correlations[0];
        assert_eq!((corr.column_a.as_str(), corr.column_b.as_str()), ("a", "b"));
        assert_eq!(corr.strength, CorrelationStrength::Strong);
    }

    #[test]
    fn test_categorical_summary() {
        let summary = profile(json!([
            {"station": "A"}, {"station": "B"}, {"station": "A"}, {"station": null}
        ]));

        let station = &summary.categorical["station"];
        assert_eq!(station.count, 3);
        assert_eq!(station.missing, 1);
        assert_eq!(station.unique_count, 2);
        assert_eq!(station.top_values[0].value, "A");
        assert_eq!(station.top_values[0].count, 2);
    }
}
