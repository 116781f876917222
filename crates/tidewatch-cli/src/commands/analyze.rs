//! Analyze command - run the engine on a data file and report.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tidewatch::{
    AnalysisResult, DataTable, Engine, EngineConfig, JsonFileStore, RecordAssessment,
};

use super::{load_table, paint_level};

/// Columns appended by `--annotate`.
const ANNOTATION_COLUMNS: [&str; 3] = ["risk_value", "risk_level", "anomaly_detected"];

pub struct AnalyzeArgs {
    pub file: PathBuf,
    pub dataset_id: Option<String>,
    pub store: Option<PathBuf>,
    pub refresh: bool,
    pub json: bool,
    pub annotate: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub fn run(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(config);

    let dataset_id = args
        .dataset_id
        .clone()
        .unwrap_or_else(|| dataset_id_for(&args.file));

    if !args.json {
        println!(
            "{} {}",
            "Analyzing".cyan().bold(),
            args.file.display().to_string().white()
        );
    }

    let table = load_table(&args.file)?;

    let mut result = match &args.store {
        Some(dir) => {
            let mut store = JsonFileStore::new(dir);
            engine.analyze_cached(&mut store, &table, &dataset_id, args.refresh)?
        }
        None => engine.analyze_table(&table, &dataset_id),
    };

    if let Some(out) = &args.annotate {
        // Stored results do not carry per-record fields
        if result.records.len() != table.row_count() && !result.is_failed() {
            result.records = engine.analyze_table(&table, &dataset_id).records;
        }
        write_annotated(out, &table, &result.records)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
        if let Some(out) = &args.annotate {
            println!(
                "{} {}",
                "Annotated rows written to".green().bold(),
                out.display().to_string().white()
            );
        }
    }

    match &result.error {
        Some(e) => Err(format!("Analysis failed: {}", e).into()),
        None => Ok(()),
    }
}

/// File stem, or the whole name when there is none.
fn dataset_id_for(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// Write the input rows followed by the computed per-record columns.
fn write_annotated(
    path: &Path,
    table: &DataTable,
    records: &[RecordAssessment],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    header.extend(ANNOTATION_COLUMNS);
    writer.write_record(&header)?;

    for (index, row) in table.rows.iter().enumerate() {
        let mut fields: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).and_then(|v| v.as_text()).unwrap_or_default())
            .collect();

        // Records are parallel to rows
        let assessment = records.get(index).filter(|r| r.index == index);
        fields.push(
            assessment
                .and_then(|a| a.risk_value)
                .map(|v| v.to_string())
                .unwrap_or_default(),
        );
        fields.push(
            assessment
                .and_then(|a| a.risk_level)
                .map(|l| l.label().to_string())
                .unwrap_or_default(),
        );
        fields.push(assessment.is_some_and(|a| a.anomaly).to_string());

        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!();

    if let Some(error) = &result.error {
        println!("{} {}", "Analysis degraded:".red().bold(), error);
        return;
    }

    let risk = &result.risk_analysis;
    let target = if risk.synthetic_target {
        format!("{} (synthetic)", risk.target_column)
    } else {
        risk.target_column.clone()
    };

    println!(
        "Risk level: {}  (score {:.2}, target {})",
        paint_level(result.risk_level),
        result.risk_score,
        target.white()
    );
    println!(
        "Records: {}  Quality: {:.1}/100",
        result.total_records.to_string().white().bold(),
        result.data_quality_score
    );
    println!(
        "Anomalies: {} ({:.2}%)  Trend: {}  Predictions: {}",
        result.anomalies.total_anomalies.to_string().white().bold(),
        result.anomalies.anomaly_rate,
        result.trend_analysis.trend_direction,
        result.predictions_count
    );

    if !result.insights.is_empty() {
        println!();
        println!("{}", "Insights:".yellow().bold());
        for insight in &result.insights {
            println!("  - {}", insight);
        }
    }

    if !result.alerts.is_empty() {
        println!();
        println!("{}", "Alerts:".red().bold());
        for alert in &result.alerts {
            println!(
                "  [{}] {} ({:.2})",
                paint_level(alert.severity),
                alert.message,
                alert.risk_score
            );
        }
    }

    if !result.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations:".cyan().bold());
        for recommendation in &result.recommendations {
            println!("  - {}", recommendation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_dataset_id_from_stem() {
        assert_eq!(dataset_id_for(Path::new("/data/harbor-sensors.csv")), "harbor-sensors");
    }

    #[test]
    fn test_annotated_csv_columns() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("annotated.csv");
        let rows = (0..40)
            .map(|i| json!({"tide_level": (i % 7) as f64, "flood_risk": (i % 10) as f64 / 10.0}))
            .collect();
        let table = DataTable::from_json(serde_json::Value::Array(rows)).unwrap();
        let result = Engine::new().analyze_table(&table, "annotate");

        write_annotated(&out, &table, &result.records).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["tide_level", "flood_risk", "risk_value", "risk_level", "anomaly_detected"]
        );

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 40);
        assert!(records.iter().all(|r| !r[3].is_empty()));
        assert!(records.iter().all(|r| &r[4] == "true" || &r[4] == "false"));
    }

    #[test]
    fn test_annotated_rows_match_their_assessment() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("annotated.csv");
        let rows = (0..12)
            .map(|i| json!({"flood_risk": i as f64 / 12.0}))
            .collect();
        let table = DataTable::from_json(serde_json::Value::Array(rows)).unwrap();
        let result = Engine::new().analyze_table(&table, "annotate");

        // Only the first half assessed
        write_annotated(&out, &table, &result.records[..6]).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let written: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(written.len(), 12);
        for (index, row) in written.iter().enumerate() {
            if index < 6 {
                let expected = result.records[index].risk_value.unwrap().to_string();
                assert_eq!(&row[1], expected.as_str());
            } else {
                assert!(row[1].is_empty());
                assert_eq!(&row[3], "false");
            }
        }
    }

    #[test]
    fn test_run_with_store_and_annotate() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("harbor.csv");
        let mut csv_text = String::from("tide_level,flood_risk\n");
        for i in 0..30 {
            csv_text.push_str(&format!("{},{}\n", 1.0 + (i % 5) as f64 * 0.2, (i % 10) as f64 / 10.0));
        }
        std::fs::write(&data, csv_text).unwrap();

        let store = dir.path().join("results");
        let out = dir.path().join("annotated.csv");
        run(AnalyzeArgs {
            file: data,
            dataset_id: None,
            store: Some(store.clone()),
            refresh: false,
            json: true,
            annotate: Some(out.clone()),
            config: None,
        })
        .unwrap();

        assert!(JsonFileStore::new(&store).path_for("harbor").exists());
        assert!(out.exists());
    }
}
