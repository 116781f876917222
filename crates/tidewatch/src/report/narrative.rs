//! Rule-based insight, alert and recommendation text.
//!
//! Every string is derived from the component outputs by fixed rules, so
//! the same analysis always reads the same way.

use chrono::{DateTime, Utc};

use super::result::{AlertType, AnalysisAlert};
use crate::analysis::{AnomalyReport, RiskAnalysis, RiskLevel, TrendAnalysis, TrendDirection};
use crate::schema::Schema;

/// Anomaly rate (%) above which an alert is raised.
const ANOMALY_ALERT_RATE: f64 = 5.0;

/// Anomaly rate (%) above which an investigation is recommended.
const ANOMALY_INVESTIGATION_RATE: f64 = 10.0;

/// Fewer records than this raise a limited-data alert.
const LIMITED_DATA_RECORDS: usize = 100;

/// Record count above which the dataset is called large.
const LARGE_DATASET_RECORDS: usize = 1000;

/// Quality scores below this raise a data-quality alert.
const MIN_QUALITY_SCORE: f64 = 60.0;

/// The component outputs the narrative rules read.
#[derive(Debug, Clone, Copy)]
pub struct Findings<'a> {
    pub total_records: usize,
    pub quality_score: f64,
    pub schema: &'a Schema,
    pub risk: &'a RiskAnalysis,
    pub trends: &'a TrendAnalysis,
    pub anomalies: &'a AnomalyReport,
}

/// Up to `max` short observations about the dataset.
pub fn insights(findings: &Findings<'_>, max: usize) -> Vec<String> {
    let Findings {
        total_records,
        schema,
        risk,
        trends,
        ..
    } = *findings;
    let mut out = Vec::new();

    if total_records > LARGE_DATASET_RECORDS {
        out.push(format!(
            "Large dataset with {} records provides robust analysis foundation",
            total_records
        ));
    }

    out.push(match risk.overall_risk_level {
        RiskLevel::Critical => format!(
            "Dataset shows critical risk concentration: {:.1}% of records reach the critical threshold",
            risk.distribution.critical.percentage
        ),
        RiskLevel::High => {
            "Dataset shows concerning high-risk patterns requiring immediate attention".to_string()
        }
        RiskLevel::Medium => "Dataset shows moderate risk levels worth monitoring".to_string(),
        RiskLevel::Low => {
            "Dataset indicates generally stable conditions with minimal risk factors".to_string()
        }
    });

    match trends.trend_direction {
        TrendDirection::Increasing => {
            out.push("Data shows increasing trend patterns that may require monitoring".to_string())
        }
        TrendDirection::Decreasing => out.push(
            "Data shows decreasing trend patterns indicating potential improvement".to_string(),
        ),
        TrendDirection::Mixed => {
            out.push("Metrics move in opposing directions with no dominant trend".to_string())
        }
        TrendDirection::Stable => {}
    }

    if let Some(top) = risk.risk_factors.first() {
        out.push(format!(
            "'{}' shows strongest correlation with risk patterns (r = {:.2})",
            top.factor, top.correlation
        ));
    }

    if schema.feature_columns.len() > 5 {
        out.push("Rich feature set enables comprehensive multi-factor risk assessment".to_string());
    }

    if risk.synthetic_target {
        out.push(format!(
            "No explicit risk column found; risk was derived from {} feature column(s)",
            schema.feature_columns.len()
        ));
    }

    if let Some(geo) = &risk.geographic_risk {
        out.push(format!(
            "High-risk records cluster around ({:.4}, {:.4})",
            geo.latitude_mean, geo.longitude_mean
        ));
    }

    if let Some(window) = risk.temporal_risks.first() {
        out.push(format!(
            "Highest-risk period begins {} (mean risk {:.2})",
            window.window_start.format("%Y-%m-%d %H:%M UTC"),
            window.mean_risk
        ));
    }

    out.truncate(max);
    out
}

/// Alerts raised by the analysis, stamped with `timestamp`.
pub fn alerts(findings: &Findings<'_>, timestamp: DateTime<Utc>) -> Vec<AnalysisAlert> {
    let Findings {
        total_records,
        quality_score,
        risk,
        trends,
        anomalies,
        ..
    } = *findings;
    let mut out = Vec::new();
    let mut push = |alert_type, message: String, risk_score, severity| {
        out.push(AnalysisAlert {
            alert_type,
            message,
            risk_score,
            severity,
            timestamp,
        })
    };

    match risk.overall_risk_level {
        RiskLevel::Critical => push(
            AlertType::CriticalRiskDetected,
            format!(
                "Critical risk conditions detected in {} records",
                risk.critical_risk_records
            ),
            0.95,
            RiskLevel::Critical,
        ),
        RiskLevel::High => push(
            AlertType::HighRiskDetected,
            format!(
                "High risk conditions detected in {} records",
                risk.high_risk_records
            ),
            0.85,
            RiskLevel::High,
        ),
        _ => {}
    }

    if anomalies.anomaly_rate > ANOMALY_ALERT_RATE {
        push(
            AlertType::AnomalyDetected,
            format!("Unusual patterns detected in {}% of data", anomalies.anomaly_rate),
            0.70,
            RiskLevel::Medium,
        );
    }

    if trends.trend_direction == TrendDirection::Increasing
        && risk.overall_risk_level >= RiskLevel::High
    {
        push(
            AlertType::RisingRiskTrend,
            format!(
                "Rising trend in {} while risk is elevated",
                trends.increasing_metrics.join(", ")
            ),
            0.80,
            RiskLevel::High,
        );
    }

    if total_records < LIMITED_DATA_RECORDS {
        push(
            AlertType::LimitedData,
            "Limited data available for comprehensive analysis".to_string(),
            0.60,
            RiskLevel::Low,
        );
    }

    if quality_score < MIN_QUALITY_SCORE {
        push(
            AlertType::DataQuality,
            format!("Data quality score {:.1} is below {}", quality_score, MIN_QUALITY_SCORE),
            0.50,
            RiskLevel::Low,
        );
    }

    out
}

/// Up to `max` recommended actions.
pub fn recommendations(findings: &Findings<'_>, max: usize) -> Vec<String> {
    let Findings {
        quality_score,
        risk,
        trends,
        anomalies,
        ..
    } = *findings;
    let mut out = Vec::new();

    if risk.overall_risk_level >= RiskLevel::High {
        out.push("Implement immediate monitoring and alerting systems".to_string());
        out.push("Consider deploying additional sensors in high-risk areas".to_string());
    }

    if anomalies.anomaly_rate > ANOMALY_INVESTIGATION_RATE {
        out.push("Investigate anomalous data patterns for potential equipment issues".to_string());
    }

    if trends.trend_direction == TrendDirection::Increasing {
        out.push("Establish trend monitoring to track pattern evolution".to_string());
    }

    if quality_score < MIN_QUALITY_SCORE {
        out.push("Fill missing values and remove duplicate records before relying on results".to_string());
    }

    out.push("Schedule regular data quality assessments".to_string());
    out.push("Consider expanding monitoring coverage based on risk patterns".to_string());

    out.truncate(max);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FactorDirection, RiskFactor};
    use crate::inference::SchemaDetector;
    use crate::input::DataTable;
    use serde_json::json;

    fn schema() -> Schema {
        SchemaDetector::new().detect(&DataTable::from_json(json!([{"risk": 0.5, "wind_speed": 3.0}])).unwrap())
    }

    fn findings<'a>(
        schema: &'a Schema,
        risk: &'a RiskAnalysis,
        trends: &'a TrendAnalysis,
        anomalies: &'a AnomalyReport,
    ) -> Findings<'a> {
        Findings {
            total_records: 500,
            quality_score: 90.0,
            schema,
            risk,
            trends,
            anomalies,
        }
    }

    #[test]
    fn test_quiet_dataset() {
        let schema = schema();
        let (risk, trends, anomalies) = (
            RiskAnalysis::default(),
            TrendAnalysis::default(),
            AnomalyReport::default(),
        );
        let f = findings(&schema, &risk, &trends, &anomalies);

        assert!(alerts(&f, Utc::now()).is_empty());
        assert_eq!(
            insights(&f, 5),
            vec!["Dataset indicates generally stable conditions with minimal risk factors"]
        );
        assert_eq!(recommendations(&f, 5).len(), 2);
    }

    #[test]
    fn test_high_risk_rising() {
        let schema = schema();
        let risk = RiskAnalysis {
            overall_risk_level: RiskLevel::High,
            high_risk_records: 42,
            risk_factors: vec![RiskFactor {
                factor: "wind_speed".to_string(),
                correlation: 0.81,
                impact: RiskLevel::Critical,
                direction: FactorDirection::Positive,
                sample_size: 500,
            }],
            ..RiskAnalysis::default()
        };
        let trends = TrendAnalysis {
            trend_direction: TrendDirection::Increasing,
            increasing_metrics: vec!["wind_speed".to_string()],
            ..TrendAnalysis::default()
        };
        let anomalies = AnomalyReport {
            anomaly_rate: 12.5,
            ..AnomalyReport::default()
        };
        let f = findings(&schema, &risk, &trends, &anomalies);

        let types: Vec<AlertType> = alerts(&f, Utc::now()).iter().map(|a| a.alert_type).collect();
        assert_eq!(
            types,
            vec![
                AlertType::HighRiskDetected,
                AlertType::AnomalyDetected,
                AlertType::RisingRiskTrend
            ]
        );

        let recs = recommendations(&f, 5);
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[0], "Implement immediate monitoring and alerting systems");

        let text = insights(&f, 5);
        assert!(text.iter().any(|i| i.starts_with("'wind_speed' shows strongest correlation")));
    }

    #[test]
    fn test_limited_and_poor_quality() {
        let schema = schema();
        let (risk, trends, anomalies) = (
            RiskAnalysis::default(),
            TrendAnalysis::default(),
            AnomalyReport::default(),
        );
        let f = Findings {
            total_records: 20,
            quality_score: 41.0,
            ..findings(&schema, &risk, &trends, &anomalies)
        };

        let types: Vec<AlertType> = alerts(&f, Utc::now()).iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::LimitedData, AlertType::DataQuality]);
    }

    #[test]
    fn test_caps_respected() {
        let schema = schema();
        let (risk, trends, anomalies) = (
            RiskAnalysis::default(),
            TrendAnalysis::default(),
            AnomalyReport::default(),
        );
        let f = findings(&schema, &risk, &trends, &anomalies);
        assert_eq!(recommendations(&f, 1).len(), 1);
        assert!(insights(&f, 0).is_empty());
    }
}
