//! Dynamic risk thresholds, tier classification and risk attribution.

use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{Frame, Schema};
use crate::stats;

/// Tolerance when comparing a value against a fitted threshold, so that a
/// constant target sits on (and therefore exceeds) every threshold.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Ordered risk tier of a record or a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Weight of this tier in the aggregate risk score.
    pub fn weight(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.1,
            RiskLevel::Medium => 0.4,
            RiskLevel::High => 0.7,
            RiskLevel::Critical => 1.0,
        }
    }

    /// Impact tier of a correlation magnitude.
    pub fn from_correlation(r: f64) -> Self {
        match r.abs() {
            a if a > 0.7 => RiskLevel::Critical,
            a if a > 0.5 => RiskLevel::High,
            a if a > 0.3 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds fitted from the target's own mean and standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub mean: f64,
    pub std: f64,
    /// `max(0, mean - std)`
    pub low: f64,
    /// `min(1, mean + std)`
    pub high: f64,
    /// `min(1, mean + 2 * std)`
    pub critical: f64,
}

impl RiskThresholds {
    /// Fit thresholds to the non-missing target values.
    pub fn fit(values: &[f64]) -> Self {
        let mean = stats::mean(values);
        let std = stats::std_dev(values);
        Self {
            mean,
            std,
            low: (mean - std).max(0.0),
            high: (mean + std).min(1.0),
            critical: (mean + 2.0 * std).min(1.0),
        }
    }

    /// Tier of a single value.
    pub fn classify(&self, value: f64) -> RiskLevel {
        if exceeds(value, self.critical) {
            RiskLevel::Critical
        } else if exceeds(value, self.high) {
            RiskLevel::High
        } else if exceeds(value, self.low) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Whether `value` reaches `threshold`, within floating-point tolerance.
/// A zero (or negative) risk value never counts as elevated.
pub fn exceeds(value: f64, threshold: f64) -> bool {
    value > 0.0 && value >= threshold - THRESHOLD_EPSILON * threshold.abs().max(1.0)
}

/// Count and share of records in one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub count: usize,
    /// Percentage of assessed records, in [0, 100].
    pub percentage: f64,
}

/// Records per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: LevelShare,
    pub medium: LevelShare,
    pub high: LevelShare,
    pub critical: LevelShare,
}

impl RiskDistribution {
    fn from_levels(levels: &[RiskLevel]) -> Self {
        let total = levels.len();
        let share = |level: RiskLevel| {
            let count = levels.iter().filter(|&&l| l == level).count();
            LevelShare {
                count,
                percentage: percentage(count, total),
            }
        };
        Self {
            low: share(RiskLevel::Low),
            medium: share(RiskLevel::Medium),
            high: share(RiskLevel::High),
            critical: share(RiskLevel::Critical),
        }
    }

    /// Share of a tier.
    pub fn get(&self, level: RiskLevel) -> LevelShare {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }
}

/// Sign of a feature's association with risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorDirection {
    Positive,
    Negative,
}

/// A feature correlated with the risk target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub correlation: f64,
    pub impact: RiskLevel,
    pub direction: FactorDirection,
    pub sample_size: usize,
}

/// Centroid of high-risk records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicRisk {
    pub latitude_mean: f64,
    pub latitude_std: f64,
    pub longitude_mean: f64,
    pub longitude_std: f64,
    pub record_count: usize,
}

/// Size of a temporal risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowGranularity {
    Hour,
    Day,
}

/// A time bucket whose mean risk exceeds the high threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRiskWindow {
    pub window_start: DateTime<Utc>,
    pub granularity: WindowGranularity,
    pub mean_risk: f64,
    pub record_count: usize,
}

/// Risk assessment of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub overall_risk_level: RiskLevel,
    /// Tier-share weighted score in [0, 1].
    pub risk_score: f64,
    pub target_column: String,
    pub synthetic_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<RiskThresholds>,
    /// Records with a target value.
    pub assessed_records: usize,
    pub distribution: RiskDistribution,
    /// Records at or above the high threshold.
    pub high_risk_records: usize,
    /// Records at or above the critical threshold.
    pub critical_risk_records: usize,
    /// Sorted by descending absolute correlation.
    pub risk_factors: Vec<RiskFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geographic_risk: Option<GeographicRisk>,
    /// Highest mean risk first.
    pub temporal_risks: Vec<TemporalRiskWindow>,
}

/// Per-record outcome of the risk assessment.
pub type RecordLevels = Vec<Option<RiskLevel>>;

/// Converts the target distribution into tiers and attributes risk.
pub struct RiskAssessor {
    /// Shared points required (strictly more than) to correlate a factor.
    min_factor_points: usize,
    /// Correlations at or below this magnitude are not factors.
    min_factor_correlation: f64,
    /// Maximum temporal windows reported.
    max_windows: usize,
}

impl RiskAssessor {
    /// Create an assessor with default settings.
    pub fn new() -> Self {
        Self {
            min_factor_points: 5,
            min_factor_correlation: 0.1,
            max_windows: 5,
        }
    }

    /// Assess the dataset and return per-record tiers (parallel to rows;
    /// `None` where the target is missing).
    pub fn assess(&self, frame: &Frame, schema: &Schema) -> (RiskAnalysis, RecordLevels) {
        let target = frame.target();
        let values = stats::present(target);

        let mut analysis = RiskAnalysis {
            target_column: schema.target.name.clone(),
            synthetic_target: schema.target.is_synthetic(),
            ..RiskAnalysis::default()
        };

        if values.is_empty() {
            return (analysis, vec![None; target.len()]);
        }

        let thresholds = RiskThresholds::fit(&values);
        let record_levels: RecordLevels = target
            .iter()
            .map(|v| v.map(|v| thresholds.classify(v)))
            .collect();
        let levels: Vec<RiskLevel> = record_levels.iter().flatten().copied().collect();

        let distribution = RiskDistribution::from_levels(&levels);
        let critical = distribution.critical.count;
        let high_or_above = critical + distribution.high.count;

        analysis.overall_risk_level =
            overall_level(percentage(critical, levels.len()), percentage(high_or_above, levels.len()));
        analysis.risk_score = levels.iter().map(RiskLevel::weight).sum::<f64>() / levels.len() as f64;
        analysis.thresholds = Some(thresholds);
        analysis.assessed_records = levels.len();
        analysis.distribution = distribution;
        analysis.high_risk_records = high_or_above;
        analysis.critical_risk_records = critical;
        analysis.risk_factors = self.risk_factors(frame, schema);
        analysis.geographic_risk = geographic_risk(frame, schema, &thresholds);
        analysis.temporal_risks = self.temporal_risks(frame, schema, &thresholds);

        tracing::debug!(
            level = %analysis.overall_risk_level,
            high = high_or_above,
            critical,
            factors = analysis.risk_factors.len(),
            "assessed risk"
        );

        (analysis, record_levels)
    }

    fn risk_factors(&self, frame: &Frame, schema: &Schema) -> Vec<RiskFactor> {
        let target = frame.target();
        let mut factors: Vec<RiskFactor> = schema
            .feature_columns
            .iter()
            .filter_map(|feature| {
                let (x, y) = stats::paired(frame.numeric(feature)?, target);
                if x.len() <= self.min_factor_points {
                    return None;
                }
                let r = stats::pearson(&x, &y)?;
                (r.abs() > self.min_factor_correlation).then(|| RiskFactor {
                    factor: feature.clone(),
                    correlation: r,
                    impact: RiskLevel::from_correlation(r),
                    direction: if r >= 0.0 {
                        FactorDirection::Positive
                    } else {
                        FactorDirection::Negative
                    },
                    sample_size: x.len(),
                })
            })
            .collect();

        factors.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        factors
    }

    fn temporal_risks(
        &self,
        frame: &Frame,
        schema: &Schema,
        thresholds: &RiskThresholds,
    ) -> Vec<TemporalRiskWindow> {
        let Some(times) = schema.primary_datetime().and_then(|c| frame.datetime(c)) else {
            return Vec::new();
        };

        let points: Vec<(DateTime<Utc>, f64)> = times
            .iter()
            .zip(frame.target())
            .filter_map(|(t, v)| Some(((*t)?, (*v)?)))
            .collect();
        let (Some(first), Some(last)) = (
            points.iter().map(|p| p.0).min(),
            points.iter().map(|p| p.0).max(),
        ) else {
            return Vec::new();
        };

        let (granularity, bucket) = if last - first > TimeDelta::days(7) {
            (WindowGranularity::Day, TimeDelta::days(1))
        } else {
            (WindowGranularity::Hour, TimeDelta::hours(1))
        };

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
        for (time, value) in points {
            let start = time.duration_trunc(bucket).unwrap_or(time);
            buckets.entry(start).or_default().push(value);
        }

        let mut windows: Vec<TemporalRiskWindow> = buckets
            .into_iter()
            .map(|(window_start, values)| TemporalRiskWindow {
                window_start,
                granularity,
                mean_risk: stats::mean(&values),
                record_count: values.len(),
            })
            .filter(|w| exceeds(w.mean_risk, thresholds.high))
            .collect();

        // Stable sort: equal means stay in chronological order
        windows.sort_by(|a, b| b.mean_risk.total_cmp(&a.mean_risk));
        windows.truncate(self.max_windows);
        windows
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall level policy; first matching rule wins.
fn overall_level(critical_pct: f64, high_pct: f64) -> RiskLevel {
    if critical_pct > 15.0 {
        RiskLevel::Critical
    } else if high_pct > 25.0 {
        RiskLevel::High
    } else if high_pct > 10.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn geographic_risk(
    frame: &Frame,
    schema: &Schema,
    thresholds: &RiskThresholds,
) -> Option<GeographicRisk> {
    let (lat_col, lon_col) = schema.coordinates()?;
    let (lats, lons) = (frame.numeric(lat_col)?, frame.numeric(lon_col)?);

    let (lat, lon): (Vec<f64>, Vec<f64>) = frame
        .target()
        .iter()
        .zip(lats.iter().zip(lons))
        .filter_map(|(risk, (lat, lon))| {
            let risk = (*risk)?;
            exceeds(risk, thresholds.high).then_some(((*lat)?, (*lon)?))
        })
        .unzip();

    if lat.is_empty() {
        return None;
    }

    Some(GeographicRisk {
        latitude_mean: stats::mean(&lat),
        latitude_std: stats::std_dev(&lat),
        longitude_mean: stats::mean(&lon),
        longitude_std: stats::std_dev(&lon),
        record_count: lat.len(),
    })
}

/// `part / total` as a percentage in [0, 100]; 0 for an empty total.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DataTable;
    use crate::inference::SchemaDetector;
    use serde_json::{json, Value};

    fn assess(rows: Vec<Value>) -> (RiskAnalysis, RecordLevels) {
        let table = DataTable::from_json(Value::Array(rows)).unwrap();
        let schema = SchemaDetector::new().detect(&table);
        let frame = Frame::build(&table, &schema).unwrap();
        RiskAssessor::new().assess(&frame, &schema)
    }

    #[test]
    fn test_thresholds() {
        let t = RiskThresholds::fit(&[0.2, 0.4, 0.6]);
        assert!((t.mean - 0.4).abs() < 1e-12);
        assert!((t.std - 0.2).abs() < 1e-12);
        assert!((t.low - 0.2).abs() < 1e-12);
        assert!((t.high - 0.6).abs() < 1e-12);
        assert!((t.critical - 0.8).abs() < 1e-12);
        assert_eq!(t.classify(0.1), RiskLevel::Low);
        assert_eq!(t.classify(0.3), RiskLevel::Medium);
        assert_eq!(t.classify(0.7), RiskLevel::High);
        assert_eq!(t.classify(0.95), RiskLevel::Critical);
    }

    #[test]
    fn test_thresholds_are_clamped() {
        let t = RiskThresholds::fit(&[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(t.low, 0.0);
        assert_eq!(t.high, 1.0);
        assert_eq!(t.critical, 1.0);
    }

    #[test]
    fn test_constant_target_is_critical() {
        let rows = (0..20).map(|_| json!({"risk_score": 0.9})).collect();
        let (analysis, levels) = assess(rows);

        assert_eq!(analysis.overall_risk_level, RiskLevel::Critical);
        assert_eq!(analysis.distribution.critical.count, 20);
        assert_eq!(analysis.distribution.critical.percentage, 100.0);
        assert!(levels.iter().all(|l| *l == Some(RiskLevel::Critical)));
        assert_eq!(analysis.risk_score, 1.0);
    }

    #[test]
    fn test_overall_level_policy() {
        assert_eq!(overall_level(16.0, 16.0), RiskLevel::Critical);
        assert_eq!(overall_level(15.0, 26.0), RiskLevel::High);
        assert_eq!(overall_level(0.0, 11.0), RiskLevel::Medium);
        assert_eq!(overall_level(0.0, 10.0), RiskLevel::Low);
    }

    #[test]
    fn test_mostly_low_dataset() {
        // 18 quiet readings and 2 spikes: only the spikes reach the high threshold
        let mut rows: Vec<Value> = (0..18).map(|i| json!({"risk": 0.1 + (i % 2) as f64 * 0.01})).collect();
        rows.push(json!({"risk": 0.9}));
        rows.push(json!({"risk": 0.9}));
        let (analysis, _) = assess(rows);

        assert_eq!(analysis.high_risk_records, 2);
        assert_eq!(analysis.overall_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_factors_ranked() {
        let rows = (0..10)
            .map(|i| {
                let i = i as f64;
                json!({
                    "risk_score": i / 10.0,
                    "tide_level": i * 2.0,
                    "pressure": 1000.0 - i * 3.0 + if i as i64 % 2 == 0 { 8.0 } else { -8.0 },
                    "humidity": 50.0,
                })
            })
            .collect();
        let (analysis, _) = assess(rows);

        let names: Vec<&str> = analysis.risk_factors.iter().map(|f| f.factor.as_str()).collect();
        assert_eq!(names, vec!["tide_level", "pressure"]);
        assert_eq!(analysis.risk_factors[0].impact, RiskLevel::Critical);
        assert_eq!(analysis.risk_factors[1].direction, FactorDirection::Negative);
    }

    #[test]
    fn test_factors_need_more_than_five_points() {
        let rows = (0..5)
            .map(|i| json!({"risk_score": i as f64 / 5.0, "tide_level": i as f64}))
            .collect();
        let (analysis, _) = assess(rows);
        assert!(analysis.risk_factors.is_empty());
    }

    #[test]
    fn test_geographic_cluster() {
        let mut rows: Vec<Value> = (0..10)
            .map(|_| json!({"risk": 0.1, "latitude": 10.0, "longitude": 70.0}))
            .collect();
        rows.push(json!({"risk": 0.95, "latitude": 19.0, "longitude": 72.8}));
        rows.push(json!({"risk": 0.95, "latitude": 19.2, "longitude": 72.9}));
        let (analysis, _) = assess(rows);

        let geo = analysis.geographic_risk.unwrap();
        assert_eq!(geo.record_count, 2);
        assert!((geo.latitude_mean - 19.1).abs() < 1e-9);
        assert!((geo.longitude_mean - 72.85).abs() < 1e-9);
    }

    #[test]
    fn test_temporal_windows_hourly() {
        let mut rows: Vec<Value> = (0..12)
            .map(|i| json!({"timestamp": format!("2024-05-01T{:02}:15:00Z", i), "risk": 0.1}))
            .collect();
        rows.push(json!({"timestamp": "2024-05-01T05:45:00Z", "risk": 0.9}));
        rows.push(json!({"timestamp": "2024-05-01T05:50:00Z", "risk": 0.9}));
        let (analysis, _) = assess(rows);

        assert_eq!(analysis.temporal_risks.len(), 1);
        let window = &analysis.temporal_risks[0];
        assert_eq!(window.granularity, WindowGranularity::Hour);
        assert_eq!(window.window_start.to_rfc3339(), "2024-05-01T05:00:00+00:00");
        assert_eq!(window.record_count, 3);
    }

    #[test]
    fn test_temporal_windows_daily() {
        let mut rows: Vec<Value> = (1..=10)
            .map(|d| json!({"timestamp": format!("2024-05-{:02}T09:30:00Z", d), "risk": 0.1}))
            .collect();
        rows.push(json!({"timestamp": "2024-05-06T13:20:00Z", "risk": 0.9}));
        rows.push(json!({"timestamp": "2024-05-06T22:45:00Z", "risk": 0.9}));
        let (analysis, _) = assess(rows);

        assert_eq!(analysis.temporal_risks.len(), 1);
        let window = &analysis.temporal_risks[0];
        assert_eq!(window.granularity, WindowGranularity::Day);
        assert_eq!(window.window_start.to_rfc3339(), "2024-05-06T00:00:00+00:00");
        assert_eq!(window.record_count, 3);
    }

    #[test]
    fn test_all_zero_target_is_low() {
        let (analysis, levels) = assess(vec![json!({"station": "A"}), json!({"station": "B"})]);
        assert!(analysis.synthetic_target);
        assert_eq!(analysis.overall_risk_level, RiskLevel::Low);
        assert_eq!(levels, vec![Some(RiskLevel::Low), Some(RiskLevel::Low)]);
    }

    #[test]
    fn test_empty_frame() {
        let table = DataTable::default();
        let schema = SchemaDetector::new().detect(&table);
        let frame = Frame::build(&table, &schema).unwrap();
        let (analysis, levels) = RiskAssessor::new().assess(&frame, &schema);

        assert_eq!(analysis.overall_risk_level, RiskLevel::Low);
        assert!(analysis.thresholds.is_none());
        assert!(levels.is_empty());
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 3), 100.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
