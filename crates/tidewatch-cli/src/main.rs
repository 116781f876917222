//! Tidewatch CLI - risk reports for tabular sensor datasets.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            file,
            dataset_id,
            store,
            refresh,
            json,
            annotate,
            config,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            file,
            dataset_id,
            store,
            refresh,
            json,
            annotate,
            config,
        }),

        Commands::Schema { file, json } => commands::schema::run(file, json),

        Commands::Show {
            dataset_id,
            store,
            json,
        } => commands::show::run(&dataset_id, store, json),

        Commands::Events {
            dataset_id,
            store,
            threshold,
            json,
        } => commands::events::run(&dataset_id, store, threshold, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
