//! Result document, rule-based narrative and notifier events.

mod narrative;
mod result;

pub use narrative::{alerts, insights, recommendations, Findings};
pub use result::{AlertType, AnalysisAlert, AnalysisResult, RecordAssessment, RiskEvent};
