//! The analysis engine and its public entry points.

use chrono::Utc;

use crate::analysis::{
    forecast_seed, AnomalyDetector, ForecastGenerator, Profiler, QualityScorer, RiskAssessor,
    TrendAnalyzer,
};
use crate::config::EngineConfig;
use crate::error::{Result, TidewatchError};
use crate::inference::SchemaDetector;
use crate::input::DataTable;
use crate::report::{self, AnalysisResult, Findings, RecordAssessment};
use crate::schema::{Frame, Schema};
use crate::store::{RecordStore, ResultStore};

/// Runs schema detection and every analysis component over a table.
///
/// The engine holds configuration only; it keeps no state between calls,
/// so one instance can serve any number of datasets.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tidewatch::{DataTable, Engine, RiskLevel};
///
/// let rows = (0..100).map(|_| json!({"risk_score": 0.9})).collect();
/// let table = DataTable::from_json(serde_json::Value::Array(rows)).unwrap();
///
/// let result = Engine::new().analyze_table(&table, "harbor");
/// assert_eq!(result.risk_level, RiskLevel::Critical);
/// ```
pub struct Engine {
    config: EngineConfig,
    detector: SchemaDetector,
    profiler: Profiler,
    assessor: RiskAssessor,
    trends: TrendAnalyzer,
    anomalies: AnomalyDetector,
    forecaster: ForecastGenerator,
    quality: QualityScorer,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let anomalies = AnomalyDetector::new()
            .with_contamination(config.contamination)
            .with_forest(
                config.forest_trees,
                config.forest_sample_size,
                config.forest_seed,
            );
        let forecaster =
            ForecastGenerator::new().with_bounds(config.min_predictions, config.max_predictions);

        Self {
            config,
            detector: SchemaDetector::new(),
            profiler: Profiler::new(),
            assessor: RiskAssessor::new(),
            trends: TrendAnalyzer::new(),
            anomalies,
            forecaster,
            quality: QualityScorer::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Detect the schema of a table.
    pub fn detect_schema(&self, table: &DataTable) -> Schema {
        self.detector.detect(table)
    }

    /// Analyze a table under a previously detected schema.
    ///
    /// Never fails: empty input or a schema that does not fit the table
    /// yields a minimal result with `error` set.
    pub fn analyze(&self, table: &DataTable, schema: &Schema, dataset_id: &str) -> AnalysisResult {
        tracing::info!(dataset_id, rows = table.row_count(), "starting analysis");

        match self.run(table, schema, dataset_id) {
            Ok(result) => {
                tracing::info!(
                    dataset_id,
                    risk_level = %result.risk_level,
                    quality = result.data_quality_score,
                    anomalies = result.anomalies.total_anomalies,
                    "analysis complete"
                );
                result
            }
            Err(e) => {
                tracing::warn!(dataset_id, error = %e, "analysis degraded");
                AnalysisResult::failed(dataset_id, e.to_string())
            }
        }
    }

    /// Detect the schema, then analyze.
    pub fn analyze_table(&self, table: &DataTable, dataset_id: &str) -> AnalysisResult {
        let schema = self.detect_schema(table);
        self.analyze(table, &schema, dataset_id)
    }

    /// Per-row anomaly flags over `feature_columns`, parallel to the rows.
    /// Columns that are missing or not numeric are ignored.
    pub fn detect_anomalies(&self, table: &DataTable, feature_columns: &[String]) -> Vec<bool> {
        let schema = self.detect_schema(table);
        match Frame::build(table, &schema) {
            Ok(frame) => self.anomalies.detect(&frame, feature_columns),
            Err(_) => vec![false; table.row_count()],
        }
    }

    /// Read-through analysis: a stored result for `dataset_id` is returned
    /// unless `refresh` is set or the rows (content or order) changed.
    /// Degraded results are returned but not stored.
    pub fn analyze_cached<S>(
        &self,
        store: &mut S,
        table: &DataTable,
        dataset_id: &str,
        refresh: bool,
    ) -> Result<AnalysisResult>
    where
        S: ResultStore + ?Sized,
    {
        if !refresh {
            if let Some(stored) = store.load_result(dataset_id)? {
                if stored.analysis_hash == table.content_hash()
                    && stored.row_fingerprint == table.row_fingerprint()
                {
                    tracing::debug!(dataset_id, "using stored result");
                    return Ok(stored);
                }
                tracing::debug!(dataset_id, "stored result is stale");
            }
        }

        let result = self.analyze_table(table, dataset_id);
        if !result.is_failed() {
            store.store_result(dataset_id, &result)?;
        }
        Ok(result)
    }

    /// Analyze a dataset held by a record store.
    ///
    /// A stored result short-circuits the run (rows are not read) unless
    /// `refresh` is set. Otherwise the rows are analyzed, the result is
    /// stored and the per-record fields are written back.
    pub fn analyze_dataset<R, S>(
        &self,
        records: &mut R,
        results: &mut S,
        dataset_id: &str,
        refresh: bool,
    ) -> Result<AnalysisResult>
    where
        R: RecordStore + ?Sized,
        S: ResultStore + ?Sized,
    {
        if !refresh {
            if let Some(stored) = results.load_result(dataset_id)? {
                tracing::debug!(dataset_id, "using stored result");
                return Ok(stored);
            }
        }

        let table = DataTable::from_records(records.read_rows(dataset_id)?);
        let result = self.analyze_table(&table, dataset_id);
        if !result.is_failed() {
            results.store_result(dataset_id, &result)?;
            records.write_record_fields(dataset_id, &result.records)?;
        }
        Ok(result)
    }

    fn run(&self, table: &DataTable, schema: &Schema, dataset_id: &str) -> Result<AnalysisResult> {
        if table.is_empty() {
            return Err(TidewatchError::EmptyData(
                "input table has no rows or no columns".to_string(),
            ));
        }

        let frame = Frame::build(table, schema)?;

        let statistical_summary = self.profiler.profile(&frame, schema);
        let (risk_analysis, levels) = self.assessor.assess(&frame, schema);
        let mut trend_analysis = self.trends.analyze(&frame, schema);
        let (anomalies, flags) = self.anomalies.analyze(&frame, schema);
        trend_analysis.hourly_series = self.trends.hourly_series(&frame, schema, &flags);
        let quality = self.quality.score(table, &frame, schema);

        let analysis_hash = table.content_hash();
        let predictions =
            self.forecaster
                .generate(&frame, schema, forecast_seed(&analysis_hash, dataset_id));

        let analysis_timestamp = Utc::now();
        let findings = Findings {
            total_records: table.row_count(),
            quality_score: quality.score,
            schema,
            risk: &risk_analysis,
            trends: &trend_analysis,
            anomalies: &anomalies,
        };
        let insights = report::insights(&findings, self.config.max_insights);
        let alerts = report::alerts(&findings, analysis_timestamp);
        let recommendations = report::recommendations(&findings, self.config.max_recommendations);

        let records = frame
            .target()
            .iter()
            .zip(levels)
            .zip(flags)
            .enumerate()
            .map(|(index, ((risk_value, risk_level), anomaly))| RecordAssessment {
                index,
                risk_value: *risk_value,
                risk_level,
                anomaly,
            })
            .collect();

        Ok(AnalysisResult {
            dataset_id: dataset_id.to_string(),
            analysis_timestamp,
            analysis_hash,
            row_fingerprint: table.row_fingerprint(),
            error: None,
            total_records: table.row_count(),
            data_quality_score: quality.score,
            quality,
            risk_level: risk_analysis.overall_risk_level,
            risk_score: risk_analysis.risk_score,
            schema: Some(schema.clone()),
            statistical_summary,
            risk_analysis,
            trend_analysis,
            anomalies,
            predictions_count: predictions.len(),
            predictions,
            insights,
            alerts,
            recommendations,
            records,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRecordStore, MemoryResultStore};
    use serde_json::{json, Value};

    fn table(rows: Vec<Value>) -> DataTable {
        DataTable::from_json(Value::Array(rows)).unwrap()
    }

    fn sensor_rows(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "timestamp": 1_714_521_600 + i as i64 * 600,
                    "wind_speed": 10.0 + (i % 13) as f64,
                    "tide_level": 1.5 + (i % 7) as f64 * 0.2,
                    "station": if i % 2 == 0 { "north" } else { "south" },
                })
            })
            .collect()
    }

    #[test]
    fn test_empty_table_degrades() {
        let result = Engine::new().analyze_table(&DataTable::default(), "empty");
        assert!(result.is_failed());
        assert_eq!(result.dataset_id, "empty");
        assert!(result.predictions.is_empty());
    }

    #[test]
    fn test_schema_mismatch_degrades() {
        let engine = Engine::new();
        let schema = engine.detect_schema(&table(vec![json!({"risk_score": 0.2})]));
        let result = engine.analyze(&table(vec![json!({"other": 1.0})]), &schema, "ds");

        assert!(result.error.unwrap().contains("Schema mismatch"));
    }

    #[test]
    fn test_records_parallel_to_rows() {
        let result = Engine::new().analyze_table(&table(sensor_rows(40)), "ds");

        assert_eq!(result.records.len(), 40);
        assert!(result.records.iter().all(|r| r.risk_value.is_some()));
        assert_eq!(
            result.records.iter().filter(|r| r.anomaly).count(),
            result.anomalies.total_anomalies
        );
        assert_eq!(result.predictions_count, result.predictions.len());
    }

    #[test]
    fn test_detect_anomalies_parallel() {
        let t = table(sensor_rows(30));
        let flags = Engine::new().detect_anomalies(&t, &["wind_speed".to_string()]);
        assert_eq!(flags.len(), 30);
    }

    #[test]
    fn test_analyze_cached_short_circuits() {
        let engine = Engine::new();
        let mut store = MemoryResultStore::new(4);
        let t = table(sensor_rows(30));

        let first = engine.analyze_cached(&mut store, &t, "ds", false).unwrap();
        let second = engine.analyze_cached(&mut store, &t, "ds", false).unwrap();
        assert_eq!(first.analysis_timestamp, second.analysis_timestamp);

        let refreshed = engine.analyze_cached(&mut store, &t, "ds", true).unwrap();
        assert_eq!(refreshed.predictions, first.predictions);
        assert!(refreshed.analysis_timestamp >= first.analysis_timestamp);
    }

    #[test]
    fn test_analyze_cached_detects_changed_content() {
        let engine = Engine::new();
        let mut store = MemoryResultStore::new(4);

        let first = engine
            .analyze_cached(&mut store, &table(sensor_rows(30)), "ds", false)
            .unwrap();
        let second = engine
            .analyze_cached(&mut store, &table(sensor_rows(31)), "ds", false)
            .unwrap();
        assert_ne!(first.analysis_hash, second.analysis_hash);
        assert_eq!(second.total_records, 31);
    }

    #[test]
    fn test_analyze_cached_reanalyzes_reordered_rows() {
        let engine = Engine::new();
        let mut store = MemoryResultStore::new(4);
        let rows = sensor_rows(30);
        let forward = table(rows.clone());
        let reversed = table(rows.into_iter().rev().collect());

        let first = engine.analyze_cached(&mut store, &forward, "ds", false).unwrap();
        let second = engine.analyze_cached(&mut store, &reversed, "ds", false).unwrap();

        // Same multiset of rows, different order
        assert_eq!(first.analysis_hash, second.analysis_hash);
        assert_ne!(first.row_fingerprint, second.row_fingerprint);
        assert_eq!(second.row_fingerprint, reversed.row_fingerprint());

        let stored = store.load_result("ds").unwrap().unwrap();
        assert_eq!(stored.row_fingerprint, reversed.row_fingerprint());
        assert_eq!(second.records[0].index, 0);
        assert_eq!(second.records[0].risk_value, first.records[29].risk_value);
    }

    #[test]
    fn test_hourly_series_covers_timestamped_rows() {
        let result = Engine::new().analyze_table(&table(sensor_rows(40)), "ds");
        let series = &result.trend_analysis.hourly_series;

        // 40 rows ten minutes apart span seven clock hours
        assert_eq!(series.buckets.len(), 7);
        assert_eq!(series.buckets.iter().map(|b| b.record_count).sum::<usize>(), 40);
        assert_eq!(
            series.buckets.iter().map(|b| b.anomaly_count).sum::<usize>(),
            result.anomalies.total_anomalies
        );
        assert!(series.buckets.windows(2).all(|w| w[0].hour_start < w[1].hour_start));
    }

    #[test]
    fn test_failed_results_not_stored() {
        let engine = Engine::new();
        let mut store = MemoryResultStore::new(4);
        let result = engine
            .analyze_cached(&mut store, &DataTable::default(), "ds", false)
            .unwrap();

        assert!(result.is_failed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_analyze_dataset_writes_back() {
        let engine = Engine::new();
        let mut records = MemoryRecordStore::new();
        let mut results = MemoryResultStore::new(4);
        let t = table(sensor_rows(25));
        records.insert("ds", t.rows.clone());

        let result = engine
            .analyze_dataset(&mut records, &mut results, "ds", false)
            .unwrap();
        assert!(!result.is_failed());
        assert_eq!(records.assessments("ds").unwrap().len(), 25);
        assert!(results.load_result("ds").unwrap().is_some());

        // Served from the result store; unknown rows are never read
        let mut empty = MemoryRecordStore::new();
        let cached = engine
            .analyze_dataset(&mut empty, &mut results, "ds", false)
            .unwrap();
        assert_eq!(cached.analysis_hash, result.analysis_hash);
    }

    #[test]
    fn test_config_bounds_predictions() {
        let config = EngineConfig {
            min_predictions: 3,
            max_predictions: 4,
            ..EngineConfig::default()
        };
        let result = Engine::with_config(config).analyze_table(&table(sensor_rows(200)), "ds");
        assert_eq!(result.predictions.len(), 4);
    }
}
