//! Codebook CLI - clinical data dictionary toolkit.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use logging::{LogConfig, init_logging};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Inspect {
            dictionary,
            format,
            generic,
            json,
        } => commands::inspect::run(dictionary, format, generic, json),

        Commands::Normalize {
            dictionary,
            dataset,
            output,
            report,
            reference_year,
        } => commands::normalize::run(dictionary, dataset, output, report, reference_year),

        Commands::Detect {
            dataset,
            min_confidence,
            json,
        } => commands::detect::run(dataset, min_confidence, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
