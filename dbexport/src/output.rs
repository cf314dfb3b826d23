//! Run summary output.

use dbexport_core::models::RunSummary;
use dbexport_core::{DbExportError, Result};
use std::path::Path;

/// Saves the run summary as pretty-printed JSON.
///
/// # Errors
/// Returns `Serialization` or `Io` on failure
pub async fn save_summary(summary: &RunSummary, output_path: &Path) -> Result<()> {
    let json_data = serde_json::to_string_pretty(summary).map_err(|e| {
        DbExportError::Serialization {
            context: "run summary".to_string(),
            source: e,
        }
    })?;

    tokio::fs::write(output_path, json_data)
        .await
        .map_err(|e| DbExportError::io(format!("Failed to write to {}", output_path.display()), e))?;
    Ok(())
}

/// One line per database plus a closing status line.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut text = String::new();

    for db in &summary.databases {
        text.push_str(&format!("{:<24} {:>5} exported", db.database, db.exported()));
        if !db.locked_objects.is_empty() {
            text.push_str(&format!(", {} locked", db.locked_objects.len()));
        }
        let status = match &db.failure {
            None => "ok".to_string(),
            Some(failure) => format!("failed ({:?}): {}", failure.stage, failure.error_message),
        };
        text.push_str(&format!("  {}\n", status));
    }

    if let Some(error) = &summary.configuration_error {
        text.push_str(&format!("configuration rejected: {}\n", error));
    }
    if let Some(error) = &summary.connection_error {
        text.push_str(&format!("connection failed: {}\n", error));
    }

    let outcome = if summary.success { "succeeded" } else { "failed" };
    text.push_str(&format!(
        "Export {} in {:.2} seconds\n",
        outcome,
        summary.elapsed_secs()
    ));
    text
}
