//! SQL Server object export tool.
//!
//! Connects to a SQL Server instance and writes one `.sql` script per
//! scalar function and table of each configured database.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - No credentials stored or logged

use clap::Parser;
use dbexport::output::{format_summary, save_summary};
use dbexport::{Cli, EXIT_CONFIG_ERROR, prompt_password};
use dbexport_core::error::redact_database_url;
use dbexport_core::logging::init_logging;
use dbexport_core::run_export;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let config = match cli.build_config(prompt_password) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Use --help for usage information");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let (None, Some(url)) = (&cli.server, &cli.database_url) {
        info!("Target: {}", redact_database_url(url));
    }
    info!("Output: {}", config.options.output_dir.display());

    let summary = run_export(&config).await;

    if !cli.global.quiet {
        print!("{}", format_summary(&summary));
    }

    if let Some(path) = &cli.summary {
        match save_summary(&summary, path).await {
            Ok(()) => info!("Run summary saved to {}", path.display()),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::from(summary.exit_code())
}
