//! Example: Analyze a sensor upload held in an in-memory record store.
//!
//! Usage:
//!   cargo run --example analyze -- <file_path>
//!
//! Example:
//!   cargo run --example analyze -- harbor.csv

use std::env;
use std::path::Path;

use tidewatch::{Engine, MemoryRecordStore, MemoryResultStore, Parser};

fn main() -> tidewatch::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example analyze -- <file_path>");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let (table, source) = Parser::new().parse_file(path)?;

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Tidewatch Analysis: {} ({} rows, {})", source.file, source.row_count, source.format);
    println!("{}", separator);
    println!();

    let dataset_id = source.file.clone();
    let mut records = MemoryRecordStore::default();
    records.insert(&dataset_id, table.rows);
    let mut results = MemoryResultStore::new(8);

    let engine = Engine::new();
    let result = engine.analyze_dataset(&mut records, &mut results, &dataset_id, false)?;

    if let Some(error) = &result.error {
        println!("Analysis degraded: {}", error);
        return Ok(());
    }

    println!("## Risk");
    println!("  Level: {}  Score: {:.3}", result.risk_level, result.risk_score);
    println!("  Target: {}", result.risk_analysis.target_column);
    for factor in &result.risk_analysis.risk_factors {
        println!(
            "  Factor {:20} r={:+.3} ({})",
            factor.factor, factor.correlation, factor.impact
        );
    }
    println!();

    println!("## Data");
    println!("  Quality: {:.1}/100", result.data_quality_score);
    println!(
        "  Anomalies: {} ({:.2}%)",
        result.anomalies.total_anomalies, result.anomalies.anomaly_rate
    );
    println!("  Trend: {}", result.trend_analysis.trend_direction);
    println!();

    println!("## Forecast");
    for prediction in result.predictions.iter().take(6) {
        println!(
            "  {:>12}  {:.3}  [{:.3}, {:.3}]  confidence {:.2}",
            prediction.time_horizon,
            prediction.predicted_value,
            prediction.lower_bound,
            prediction.upper_bound,
            prediction.confidence
        );
    }
    println!();

    let written = records.assessments(&dataset_id).unwrap_or_default();
    let flagged = written.iter().filter(|r| r.anomaly).count();
    println!("{} records written back, {} flagged anomalous", written.len(), flagged);

    Ok(())
}
