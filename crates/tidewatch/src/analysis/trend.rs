//! Linear trend extraction over the primary timestamp column.
//!
//! Two views: per-metric least-squares fits against elapsed time, and an
//! hourly series of bucketed aggregates with a slope over bucket risk.

use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::risk::percentage;
use crate::schema::{Frame, Schema};
use crate::stats;

/// Direction of the dataset as a whole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Mixed,
    #[default]
    Stable,
}

impl TrendDirection {
    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "INCREASING",
            TrendDirection::Decreasing => "DECREASING",
            TrendDirection::Mixed => "MIXED",
            TrendDirection::Stable => "STABLE",
        }
    }

    /// Whether the direction is monotonic.
    pub fn is_monotonic(&self) -> bool {
        matches!(self, TrendDirection::Increasing | TrendDirection::Decreasing)
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    Increasing,
    Decreasing,
    Flat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Predictability {
    High,
    #[default]
    Medium,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSufficiency {
    Sufficient,
    #[default]
    Limited,
}

/// Trend of one numeric column against elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub column: String,
    /// Paired (time, value) points used in the fit.
    pub points: usize,
    /// Least-squares slope in value units per hour.
    pub slope: f64,
    /// Slope scaled by time range over value range.
    pub normalized_slope: f64,
    pub direction: MetricDirection,
    /// `min(100, |normalized_slope| * 100)`
    pub strength: f64,
    /// Coefficient of determination of the fit.
    pub confidence: f64,
    /// Coefficient of variation; only for columns with enough points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    pub has_cycles: bool,
}

/// Summary of one column's values inside an hourly bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    pub column: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation; 0 for a single value.
    pub std: f64,
    pub count: usize,
}

impl MetricAggregate {
    /// `None` when the bucket holds no value for the column. Figures are
    /// rounded to three decimals.
    fn from_values(column: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let avg = stats::mean(values);
        let (min, max) = stats::min_max(values);
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            column: column.to_string(),
            avg: round_to(avg, 3),
            min: round_to(min, 3),
            max: round_to(max, 3),
            std: round_to(std, 3),
            count: values.len(),
        })
    }
}

/// Records sharing one clock hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour_start: DateTime<Utc>,
    pub record_count: usize,
    pub anomaly_count: usize,
    /// Percentage of the bucket's records flagged anomalous.
    pub anomaly_rate: f64,
    /// Aggregate of the risk target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<MetricAggregate>,
    /// Aggregates of the feature columns with values in this hour.
    pub metrics: Vec<MetricAggregate>,
}

/// Direction of bucket risk means across the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesIndicator {
    pub direction: MetricDirection,
    /// `min(100, |slope| * 100)`, two decimals.
    pub strength: f64,
    /// Least-squares slope of risk mean per bucket, four decimals.
    pub slope: f64,
}

/// Hourly aggregates in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub buckets: Vec<HourlyBucket>,
    /// Present once at least three buckets carry a positive risk mean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<SeriesIndicator>,
}

/// Trend analysis of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend_direction: TrendDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime_column: Option<String>,
    pub metrics: Vec<MetricTrend>,
    pub increasing_metrics: Vec<String>,
    pub decreasing_metrics: Vec<String>,
    /// Any metric flagged with cycles.
    pub seasonal_patterns: bool,
    pub forecast_predictability: Predictability,
    pub data_sufficiency: DataSufficiency,
    #[serde(default)]
    pub hourly_series: HourlySeries,
}

/// Fits per-column linear trends.
pub struct TrendAnalyzer {
    min_points: usize,
    volatility_points: usize,
    /// Normalized slope beyond which a metric is directional.
    slope_threshold: f64,
    /// Coefficient of variation above which a metric has cycles.
    cycle_threshold: f64,
    /// Rows required (strictly more than) for sufficient data.
    sufficient_rows: usize,
    /// Per-bucket slope beyond which the hourly series is directional.
    series_slope_threshold: f64,
    /// Buckets with a positive risk mean needed for a series indicator.
    series_min_buckets: usize,
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self {
            min_points: 10,
            volatility_points: 50,
            slope_threshold: 0.1,
            cycle_threshold: 0.2,
            sufficient_rows: 100,
            series_slope_threshold: 0.01,
            series_min_buckets: 3,
        }
    }

    pub fn analyze(&self, frame: &Frame, schema: &Schema) -> TrendAnalysis {
        let Some((time_column, times)) = schema
            .primary_datetime()
            .and_then(|c| frame.datetime(c).map(|t| (c, t)))
        else {
            return TrendAnalysis::default();
        };

        let mut analysis = TrendAnalysis {
            datetime_column: Some(time_column.to_string()),
            data_sufficiency: if frame.row_count() > self.sufficient_rows {
                DataSufficiency::Sufficient
            } else {
                DataSufficiency::Limited
            },
            ..TrendAnalysis::default()
        };

        let origin = times.iter().flatten().min().copied();
        let elapsed: Vec<Option<f64>> = times
            .iter()
            .map(|t| {
                let (t, origin) = ((*t)?, origin?);
                Some((t - origin).num_milliseconds() as f64 / 3_600_000.0)
            })
            .collect();

        for column in &schema.numeric_columns {
            let Some(values) = frame.numeric(column) else {
                continue;
            };
            let Some(metric) = self.metric_trend(column, &elapsed, values) else {
                continue;
            };
            match metric.direction {
                MetricDirection::Increasing => analysis.increasing_metrics.push(column.clone()),
                MetricDirection::Decreasing => analysis.decreasing_metrics.push(column.clone()),
                MetricDirection::Flat => {}
            }
            analysis.seasonal_patterns |= metric.has_cycles;
            analysis.metrics.push(metric);
        }

        analysis.trend_direction = overall_direction(
            analysis.increasing_metrics.len(),
            analysis.decreasing_metrics.len(),
        );
        analysis.forecast_predictability = if analysis.trend_direction.is_monotonic() {
            Predictability::High
        } else {
            Predictability::Medium
        };

        tracing::debug!(
            direction = %analysis.trend_direction,
            metrics = analysis.metrics.len(),
            "analyzed trends"
        );

        analysis
    }

    /// Group rows by clock hour of the primary timestamp and aggregate the
    /// risk target, anomaly flags (parallel to rows) and feature columns.
    /// Rows without a timestamp are left out.
    pub fn hourly_series(&self, frame: &Frame, schema: &Schema, anomalies: &[bool]) -> HourlySeries {
        let Some(times) = schema.primary_datetime().and_then(|c| frame.datetime(c)) else {
            return HourlySeries::default();
        };

        let mut groups: BTreeMap<DateTime<Utc>, Vec<usize>> = BTreeMap::new();
        for (row, time) in times.iter().enumerate() {
            let Some(time) = *time else {
                continue;
            };
            let hour = time.duration_trunc(TimeDelta::hours(1)).unwrap_or(time);
            groups.entry(hour).or_default().push(row);
        }

        let features: Vec<(&str, &[Option<f64>])> = schema
            .feature_columns
            .iter()
            .filter_map(|c| frame.numeric(c).map(|v| (c.as_str(), v)))
            .collect();
        let target = frame.target();

        let buckets: Vec<HourlyBucket> = groups
            .into_iter()
            .map(|(hour_start, rows)| {
                let values_in = |column: &[Option<f64>]| -> Vec<f64> {
                    rows.iter().filter_map(|&r| column.get(r).copied().flatten()).collect()
                };
                let anomaly_count = rows
                    .iter()
                    .filter(|&&r| anomalies.get(r).copied().unwrap_or(false))
                    .count();

                HourlyBucket {
                    hour_start,
                    record_count: rows.len(),
                    anomaly_count,
                    anomaly_rate: percentage(anomaly_count, rows.len()),
                    risk: MetricAggregate::from_values(&schema.target.name, &values_in(target)),
                    metrics: features
                        .iter()
                        .filter_map(|(name, column)| {
                            MetricAggregate::from_values(name, &values_in(column))
                        })
                        .collect(),
                }
            })
            .collect();

        let indicator = self.series_indicator(&buckets);
        tracing::debug!(buckets = buckets.len(), "built hourly series");

        HourlySeries { buckets, indicator }
    }

    fn series_indicator(&self, buckets: &[HourlyBucket]) -> Option<SeriesIndicator> {
        let means: Vec<f64> = buckets
            .iter()
            .filter_map(|b| b.risk.as_ref())
            .map(|r| r.avg)
            .filter(|&m| m > 0.0)
            .collect();
        if means.len() < self.series_min_buckets {
            return None;
        }

        let x: Vec<f64> = (0..means.len()).map(|i| i as f64).collect();
        let slope = stats::linear_fit(&x, &means)?.slope;
        let direction = if slope > self.series_slope_threshold {
            MetricDirection::Increasing
        } else if slope < -self.series_slope_threshold {
            MetricDirection::Decreasing
        } else {
            MetricDirection::Flat
        };

        Some(SeriesIndicator {
            direction,
            strength: round_to((slope.abs() * 100.0).min(100.0), 2),
            slope: round_to(slope, 4),
        })
    }

    fn metric_trend(
        &self,
        column: &str,
        elapsed: &[Option<f64>],
        values: &[Option<f64>],
    ) -> Option<MetricTrend> {
        let (x, y) = stats::paired(elapsed, values);
        if x.len() < self.min_points {
            return None;
        }

        let fit = stats::linear_fit(&x, &y)?;
        let (t_min, t_max) = stats::min_max(&x);
        let (v_min, v_max) = stats::min_max(&y);
        let value_range = v_max - v_min;
        let normalized_slope = if value_range > 0.0 {
            fit.slope * (t_max - t_min) / value_range
        } else {
            0.0
        };

        let direction = if normalized_slope > self.slope_threshold {
            MetricDirection::Increasing
        } else if normalized_slope < -self.slope_threshold {
            MetricDirection::Decreasing
        } else {
            MetricDirection::Flat
        };

        let volatility = (y.len() >= self.volatility_points)
            .then(|| stats::coefficient_of_variation(&y));

        Some(MetricTrend {
            column: column.to_string(),
            points: x.len(),
            slope: fit.slope,
            normalized_slope,
            direction,
            strength: (normalized_slope.abs() * 100.0).min(100.0),
            confidence: fit.r_squared,
            volatility,
            has_cycles: volatility.is_some_and(|v| v > self.cycle_threshold),
        })
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn overall_direction(increasing: usize, decreasing: usize) -> TrendDirection {
    match (increasing, decreasing) {
        (i, d) if i > d => TrendDirection::Increasing,
        (i, d) if d > i => TrendDirection::Decreasing,
        (i, _) if i > 0 => TrendDirection::Mixed,
        _ => TrendDirection::Stable,
    }
}
