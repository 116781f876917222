//! Show command - print a stored result without recomputing it.

use std::path::PathBuf;

use colored::Colorize;
use tidewatch::{AnalysisResult, JsonFileStore, ResultStore};

use super::paint_level;

/// Load a stored result or explain how to create one.
pub(crate) fn load_stored(
    store: &JsonFileStore,
    dataset_id: &str,
) -> Result<AnalysisResult, Box<dyn std::error::Error>> {
    store.load_result(dataset_id)?.ok_or_else(|| {
        format!(
            "No stored result for '{}' in {}\nRun 'tidewatch analyze <FILE> --dataset-id {} --store {}' first.",
            dataset_id,
            store.dir().display(),
            dataset_id,
            store.dir().display()
        )
        .into()
    })
}

pub fn run(
    dataset_id: &str,
    store: PathBuf,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(store);
    let result = load_stored(&store, dataset_id)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Stored result for".cyan().bold(),
        result.dataset_id.white()
    );
    println!(
        "Analyzed at {} (hash {})",
        result.analysis_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        short_hash(&result.analysis_hash)
    );
    println!();
    println!(
        "Risk level: {}  Score: {:.2}  Records: {}  Quality: {:.1}",
        paint_level(result.risk_level),
        result.risk_score,
        result.total_records,
        result.data_quality_score
    );
    println!(
        "{} alerts, {} insights, {} predictions",
        result.alerts.len(),
        result.insights.len(),
        result.predictions_count
    );

    for alert in &result.alerts {
        println!("  [{}] {}", paint_level(alert.severity), alert.message);
    }

    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
