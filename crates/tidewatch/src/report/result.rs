//! The analysis result document and the structures derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{
    AnomalyReport, Prediction, QualityBreakdown, RiskAnalysis, RiskLevel, StatisticalSummary,
    TrendAnalysis,
};
use crate::schema::Schema;

/// Kind of an analysis alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    CriticalRiskDetected,
    HighRiskDetected,
    AnomalyDetected,
    RisingRiskTrend,
    LimitedData,
    DataQuality,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::CriticalRiskDetected => "CRITICAL_RISK_DETECTED",
            AlertType::HighRiskDetected => "HIGH_RISK_DETECTED",
            AlertType::AnomalyDetected => "ANOMALY_DETECTED",
            AlertType::RisingRiskTrend => "RISING_RISK_TREND",
            AlertType::LimitedData => "LIMITED_DATA",
            AlertType::DataQuality => "DATA_QUALITY",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert raised by the analysis rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisAlert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    /// Urgency in [0, 1]; compared against the alert threshold.
    pub risk_score: f64,
    pub severity: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

/// Per-record computed fields, written back to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordAssessment {
    /// Row index in the analyzed table.
    pub index: usize,
    /// Real or synthetic target value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub anomaly: bool,
}

/// What an external notifier receives for an alert worth delivering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub dataset_id: String,
    pub alert_type: AlertType,
    pub message: String,
    pub risk_score: f64,
    pub severity: RiskLevel,
    /// Overall level of the analysis the alert came from.
    pub risk_level: RiskLevel,
    pub timestamp: DateTime<Utc>,
}

/// Complete result of analyzing one dataset.
///
/// Replaced wholesale on re-analysis; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dataset_id: String,
    pub analysis_timestamp: DateTime<Utc>,
    /// Structural hash of the analyzed rows; ignores row order.
    pub analysis_hash: String,
    /// Order-sensitive hash of the analyzed rows. A stored result is only
    /// reused for rows in the same order, since row indices appear in it.
    #[serde(default)]
    pub row_fingerprint: String,
    /// Set when the analysis degraded to a minimal result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_records: usize,
    /// In [0, 100].
    pub data_quality_score: f64,
    #[serde(default)]
    pub quality: QualityBreakdown,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub statistical_summary: StatisticalSummary,
    #[serde(default)]
    pub risk_analysis: RiskAnalysis,
    #[serde(default)]
    pub trend_analysis: TrendAnalysis,
    #[serde(default)]
    pub anomalies: AnomalyReport,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub predictions_count: usize,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<AnalysisAlert>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Per-record fields of this run; not persisted.
    #[serde(skip)]
    pub records: Vec<RecordAssessment>,
}

impl AnalysisResult {
    /// Minimal result for an analysis that could not run.
    pub fn failed(dataset_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            analysis_timestamp: Utc::now(),
            analysis_hash: String::new(),
            row_fingerprint: String::new(),
            error: Some(error.into()),
            total_records: 0,
            data_quality_score: 0.0,
            quality: QualityBreakdown::default(),
            risk_level: RiskLevel::Low,
            risk_score: 0.0,
            schema: None,
            statistical_summary: StatisticalSummary::default(),
            risk_analysis: RiskAnalysis::default(),
            trend_analysis: TrendAnalysis::default(),
            anomalies: AnomalyReport::default(),
            predictions: Vec::new(),
            predictions_count: 0,
            insights: Vec::new(),
            alerts: Vec::new(),
            recommendations: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Whether the analysis degraded.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Alerts at or above `threshold`, shaped for a notifier.
    pub fn risk_events(&self, threshold: f64) -> Vec<RiskEvent> {
        self.alerts
            .iter()
            .filter(|alert| alert.risk_score >= threshold)
            .map(|alert| RiskEvent {
                dataset_id: self.dataset_id.clone(),
                alert_type: alert.alert_type,
                message: alert.message.clone(),
                risk_score: alert.risk_score,
                severity: alert.severity,
                risk_level: self.risk_level,
                timestamp: alert.timestamp,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(alert_type: AlertType, risk_score: f64) -> AnalysisAlert {
        AnalysisAlert {
            alert_type,
            message: alert_type.to_string(),
            risk_score,
            severity: RiskLevel::High,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_failed_result() {
        let result = AnalysisResult::failed("ds-1", "no rows");
        assert!(result.is_failed());
        assert_eq!(result.total_records, 0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "no rows");
        assert!(json.get("schema").is_none());
        assert!(json.get("records").is_none());
    }

    #[test]
    fn test_risk_events_filter_by_threshold() {
        let mut result = AnalysisResult::failed("ds-1", "");
        result.error = None;
        result.risk_level = RiskLevel::High;
        result.alerts = vec![
            alert(AlertType::HighRiskDetected, 0.85),
            alert(AlertType::AnomalyDetected, 0.70),
            alert(AlertType::LimitedData, 0.60),
        ];

        let events = result.risk_events(0.7);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].alert_type, AlertType::HighRiskDetected);
        assert_eq!(events[1].risk_level, RiskLevel::High);
        assert_eq!(events[1].dataset_id, "ds-1");
    }

    #[test]
    fn test_alert_serializes_type_key() {
        let json = serde_json::to_value(alert(AlertType::RisingRiskTrend, 0.8)).unwrap();
        assert_eq!(json["type"], "RISING_RISK_TREND");
        assert_eq!(json["severity"], "HIGH");
    }

    #[test]
    fn test_round_trip_keeps_document() {
        let result = AnalysisResult::failed("ds-2", "bad input");
        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
