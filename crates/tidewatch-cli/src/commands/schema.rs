//! Schema command - show how a file's columns were classified.

use std::path::PathBuf;

use colored::Colorize;
use tidewatch::schema::TargetOrigin;
use tidewatch::Engine;

use super::load_table;

pub fn run(file: PathBuf, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_table(&file)?;
    let schema = Engine::new().detect_schema(&table);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    println!(
        "{} {} ({} rows)",
        "Schema for".cyan().bold(),
        file.display().to_string().white(),
        schema.row_count
    );
    println!();

    for col in &schema.columns {
        let mut roles = Vec::new();
        if col.is_target {
            roles.push("target".yellow().bold().to_string());
        }
        if col.is_feature {
            roles.push("feature".to_string());
        }
        if schema.latitude_column.as_deref() == Some(col.name.as_str())
            || schema.longitude_column.as_deref() == Some(col.name.as_str())
        {
            roles.push("coordinate".to_string());
        }

        println!(
            "  {:20} {:12} {:>6} values  {}",
            col.name,
            format!("{:?}", col.kind),
            col.non_missing,
            roles.join(", ")
        );
    }

    println!();
    match &schema.target.origin {
        TargetOrigin::Detected => {
            println!("Target: {}", schema.target.name.white().bold());
        }
        TargetOrigin::Synthetic { weights } => {
            println!(
                "Target: {} {}",
                schema.target.name.white().bold(),
                "(synthesized)".yellow()
            );
            for (feature, weight) in weights {
                println!("  {:20} weight {:.3}", feature, weight);
            }
        }
    }

    Ok(())
}
