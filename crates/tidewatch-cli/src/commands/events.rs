//! Events command - list what a notifier would deliver for a stored result.

use std::path::PathBuf;

use colored::Colorize;
use tidewatch::JsonFileStore;

use super::paint_level;
use super::show::load_stored;

pub fn run(
    dataset_id: &str,
    store: PathBuf,
    threshold: f64,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("threshold must be in [0, 1], got {}", threshold).into());
    }

    let store = JsonFileStore::new(store);
    let result = load_stored(&store, dataset_id)?;
    let events = result.risk_events(threshold);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!(
            "{}",
            format!("No alerts at or above {:.2} for '{}'", threshold, dataset_id).green()
        );
        return Ok(());
    }

    println!(
        "{} {} for {}",
        events.len().to_string().white().bold(),
        if events.len() == 1 { "event" } else { "events" },
        dataset_id.cyan()
    );
    for event in &events {
        println!(
            "  {:28} [{}] {:.2}  {}",
            event.alert_type.as_str(),
            paint_level(event.severity),
            event.risk_score,
            event.message
        );
    }

    Ok(())
}
