//! Bovine Classifier - Main Entry Point

use std::process::ExitCode;

use clap::Parser;
use classifier_cli::{init_logging, AppConfig, Cli, CliError};
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let config = AppConfig::load()?;
    init_logging(&config)?;

    info!("=== Bovine Classifier v{} ===", env!("CARGO_PKG_VERSION"));
    cli.command.run(&config)
}
