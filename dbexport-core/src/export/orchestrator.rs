//! Run orchestration across the configured databases.

use crate::adapters::{CatalogSession, open_session};
use crate::export::config::ExportConfig;
use crate::export::pipeline::{describe, elapsed_ms, export_database};
use crate::models::RunSummary;
use crate::Result;
use std::future::Future;
use std::time::Instant;

/// Connects with the SQL Server adapter and runs the export.
///
/// # Example
/// ```rust,no_run
/// use dbexport_core::adapters::{ConnectionConfig, ServerAddress};
/// use dbexport_core::export::{ExportConfig, run_export};
/// use dbexport_core::security::Credentials;
///
/// # async fn example() {
/// let config = ExportConfig::new(
///     ConnectionConfig::new(ServerAddress::new("db01")),
///     Credentials::new("reader".to_string(), Some("secret".to_string())),
///     vec!["Sales".to_string()],
/// );
/// let summary = run_export(&config).await;
/// std::process::exit(i32::from(summary.exit_code()));
/// # }
/// ```
pub async fn run_export(config: &ExportConfig) -> RunSummary {
    run(config, open_session(&config.connection, &config.credentials)).await
}

/// Runs the export over a session produced by `connect`.
///
/// Databases are processed strictly in configured order. A failed database
/// marks the run failed and the next one is attempted. A failed connection
/// ends the run before any database is touched. An invalid configuration
/// ends it before `connect` is awaited.
pub async fn run<F>(config: &ExportConfig, connect: F) -> RunSummary
where
    F: Future<Output = Result<Box<dyn CatalogSession>>>,
{
    let start = Instant::now();
    let mut summary = RunSummary {
        started_at: chrono::Utc::now(),
        elapsed_ms: 0,
        connected: false,
        configuration_error: None,
        connection_error: None,
        databases: Vec::with_capacity(config.databases.len()),
        success: false,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if let Err(e) = config.validate() {
        let message = describe(&e);
        tracing::error!("{}", message);
        summary.configuration_error = Some(message);
        summary.elapsed_ms = elapsed_ms(start);
        log_outcome(&summary);
        return summary;
    }

    tracing::info!("Connecting to {}", config.connection);

    let mut session = match connect.await {
        Ok(session) => session,
        Err(e) => {
            let message = describe(&e);
            tracing::error!("{}", message);
            summary.connection_error = Some(message);
            summary.elapsed_ms = elapsed_ms(start);
            log_outcome(&summary);
            return summary;
        }
    };

    summary.connected = true;
    tracing::info!("Connected: {}", session.safe_description());

    for database in &config.databases {
        let report = export_database(session.as_mut(), database, &config.options).await;
        summary.databases.push(report);
    }

    if let Err(e) = session.close().await {
        tracing::warn!("Error closing the connection: {}", describe(&e));
    }

    summary.success = summary.databases.iter().all(|db| db.is_success());
    summary.elapsed_ms = elapsed_ms(start);
    log_outcome(&summary);
    summary
}

fn log_outcome(summary: &RunSummary) {
    let failed: Vec<&str> = summary
        .databases
        .iter()
        .filter(|db| !db.is_success())
        .map(|db| db.database.as_str())
        .collect();
    let locked: usize = summary.databases.iter().map(|db| db.locked_objects.len()).sum();

    tracing::info!("Total time taken: {:.2} seconds", summary.elapsed_secs());

    if summary.success {
        tracing::info!(
            "Export completed successfully: {} database(s), {} locked object(s)",
            summary.databases.len(),
            locked
        );
    } else if summary.connected {
        tracing::error!(
            "Export completed with failures in {} of {} database(s): {}",
            failed.len(),
            summary.databases.len(),
            failed.join(", ")
        );
    } else if summary.configuration_error.is_some() {
        tracing::error!("Export failed: invalid configuration");
    } else {
        tracing::error!("Export failed: no connection to the server");
    }
}
