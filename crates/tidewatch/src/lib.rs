//! Tidewatch: deterministic risk analysis for tabular sensor datasets.
//!
//! Tidewatch takes uploads of unknown shape (coastal sensor readings,
//! station logs, ad-hoc exports) and turns them into a single, reproducible
//! risk report without any trained model.
//!
//! # Pipeline
//!
//! - **Schema detection**: classify columns, pick the risk target or
//!   synthesize one from feature columns
//! - **Profiling**: summary statistics, correlations, IQR outliers
//! - **Risk assessment**: thresholds fitted to the target's own distribution
//! - **Trends**: least-squares slopes against elapsed time
//! - **Anomalies**: seeded isolation forest over the numeric columns
//! - **Forecast**: short-horizon predictions seeded by the content hash
//!
//! The same rows and dataset id always produce the same hash and the same
//! predictions.
//!
//! # Example
//!
//! ```no_run
//! use tidewatch::{Engine, Parser};
//!
//! let (table, _source) = Parser::new().parse_file("harbor.csv").unwrap();
//! let result = Engine::new().analyze_table(&table, "harbor");
//!
//! println!("Risk level: {}", result.risk_level);
//! println!("Quality: {:.1}", result.data_quality_score);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod inference;
pub mod input;
pub mod report;
pub mod schema;
pub mod stats;
pub mod store;

mod engine;

pub use analysis::{Prediction, RiskLevel, TrendDirection};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Result, TidewatchError};
pub use input::{DataTable, Parser, ParserConfig, Record, Scalar, SourceMetadata};
pub use report::{AlertType, AnalysisAlert, AnalysisResult, RecordAssessment, RiskEvent};
pub use schema::{ColumnKind, Schema};
pub use store::{JsonFileStore, MemoryRecordStore, MemoryResultStore, RecordStore, ResultStore};
