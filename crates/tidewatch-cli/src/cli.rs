//! CLI argument definitions using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Tidewatch: deterministic risk analysis for tabular sensor datasets
#[derive(Parser)]
#[command(name = "tidewatch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a data file and print the risk report
    Analyze {
        /// Path to the data file (CSV/TSV/JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dataset id (default: file stem)
        #[arg(short, long)]
        dataset_id: Option<String>,

        /// Directory of stored results to read through
        #[arg(short, long, value_name = "DIR")]
        store: Option<PathBuf>,

        /// Recompute even when a stored result exists
        #[arg(long)]
        refresh: bool,

        /// Output the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write the rows with risk_value, risk_level and anomaly_detected columns
        #[arg(long, value_name = "OUT")]
        annotate: Option<PathBuf>,

        /// Engine configuration file (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show the detected schema of a data file
    Schema {
        /// Path to the data file (CSV/TSV/JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored result without recomputing it
    Show {
        /// Dataset id of the stored result
        #[arg(value_name = "DATASET_ID")]
        dataset_id: String,

        /// Directory of stored results
        #[arg(short, long, value_name = "DIR", default_value = "tidewatch-results")]
        store: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the risk events a notifier would receive for a stored result
    Events {
        /// Dataset id of the stored result
        #[arg(value_name = "DATASET_ID")]
        dataset_id: String,

        /// Directory of stored results
        #[arg(short, long, value_name = "DIR", default_value = "tidewatch-results")]
        store: PathBuf,

        /// Minimum alert risk score to deliver
        #[arg(short, long, default_value = "0.7")]
        threshold: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from([
            "tidewatch",
            "-vv",
            "analyze",
            "harbor.csv",
            "--store",
            "results",
            "--refresh",
            "--annotate",
            "out.csv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze {
                file,
                store,
                refresh,
                annotate,
                dataset_id,
                ..
            } => {
                assert_eq!(file, PathBuf::from("harbor.csv"));
                assert_eq!(store, Some(PathBuf::from("results")));
                assert!(refresh);
                assert_eq!(annotate, Some(PathBuf::from("out.csv")));
                assert!(dataset_id.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_events_default_threshold() {
        let cli = Cli::parse_from(["tidewatch", "events", "harbor"]);
        match cli.command {
            Commands::Events {
                threshold, store, ..
            } => {
                assert_eq!(threshold, 0.7);
                assert_eq!(store, PathBuf::from("tidewatch-results"));
            }
            _ => panic!("expected events"),
        }
    }
}
