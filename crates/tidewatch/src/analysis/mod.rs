//! Analysis components.
//!
//! Each component reads the same [`Frame`](crate::schema::Frame) and
//! [`Schema`](crate::schema::Schema) and produces one section of the final
//! report. None of them fail: thin or missing data yields default sections.

mod anomaly;
mod forecast;
mod profile;
mod quality;
mod risk;
mod trend;

pub use anomaly::{
    AnomalyDetector, AnomalyReport, IsolationForest, PATTERN_DEVIATION, STATISTICAL_OUTLIER,
};
pub use forecast::{forecast_seed, ForecastGenerator, Prediction};
pub use profile::{
    outlier_mask, CategoricalSummary, Correlation, CorrelationStrength, NumericSummary, Profiler,
    StatisticalSummary, ValueCount,
};
pub use quality::{QualityBreakdown, QualityScorer};
pub use risk::{
    exceeds, percentage, FactorDirection, GeographicRisk, LevelShare, RecordLevels, RiskAnalysis,
    RiskAssessor, RiskDistribution, RiskFactor, RiskLevel, RiskThresholds, TemporalRiskWindow,
    WindowGranularity,
};
pub use trend::{
    DataSufficiency, HourlyBucket, HourlySeries, MetricAggregate, MetricDirection, MetricTrend,
    Predictability, SeriesIndicator, TrendAnalysis, TrendAnalyzer, TrendDirection,
};
