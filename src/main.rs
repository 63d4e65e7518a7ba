//! # churnflow command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load the run configuration
//!   ├─> Initialize logging into the configured log directory
//!   └─> Execute the subcommand
//! ```
//!
//! ```bash
//! churnflow run --records 2000
//! churnflow run --input data/raw/customers.csv --output-dir data/processed
//! churnflow analyze --data data/processed/telecom_churn_processed.csv -k 4
//! ```
//!
//! The process exits with status 1 when the command errors or the pipeline
//! run ends in the `Failed` state.

#![expect(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::Parser as _;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = churnflow::logging::init(&config.log_dir) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match cli::run_command(cli.command, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
