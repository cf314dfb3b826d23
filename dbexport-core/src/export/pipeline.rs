//! One database pass: select, enumerate, render, write, report.

use crate::adapters::CatalogSession;
use crate::error::DbExportError;
use crate::export::config::ExportOptions;
use crate::export::render::render_object;
use crate::export::tracker::LockedObjectTracker;
use crate::export::writer::ScriptWriter;
use crate::models::{DatabaseFailure, DatabaseReport, FailureStage, KindExport, ObjectKind};
use crate::Result;
use std::time::Instant;

/// Exports every selected object class of one database.
///
/// The pass never returns an error: failures are recorded in the report.
/// Unreadable objects go to the locked-object report and the pass
/// continues. Any other error stops the pass; locked objects detected
/// before the failure are still reported.
pub async fn export_database(
    session: &mut dyn CatalogSession,
    database: &str,
    options: &ExportOptions,
) -> DatabaseReport {
    let start = Instant::now();
    let mut report = DatabaseReport::new(database);

    tracing::info!("Exporting database '{}'", database);

    if let Err(e) = session.use_database(database).await {
        tracing::error!("Error selecting database '{}': {}", database, describe(&e));
        report.failure = Some(failure(FailureStage::Selection, &e));
        report.duration_ms = elapsed_ms(start);
        return report;
    }

    let mut tracker = LockedObjectTracker::new(database);

    for &kind in &options.object_kinds {
        let mut counts = KindExport {
            kind,
            discovered: 0,
            exported: 0,
            locked: 0,
        };
        let outcome = export_kind(session, database, kind, options, &mut tracker, &mut counts).await;
        report.kinds.push(counts);

        if let Err(e) = outcome {
            tracing::error!(
                "Error exporting {} from '{}': {}",
                kind.plural().to_lowercase(),
                database,
                describe(&e)
            );
            report.failure = Some(failure(stage_of(&e), &e));
            break;
        }
    }

    report.locked_objects = tracker.names();
    match tracker.flush(&options.reference_folder()).await {
        Ok(path) => report.locked_report = path,
        Err(e) => {
            tracing::error!("Error writing locked-object report for '{}': {}", database, describe(&e));
            if report.failure.is_none() {
                report.failure = Some(failure(FailureStage::Output, &e));
            }
        }
    }

    report.duration_ms = elapsed_ms(start);

    if report.is_success() {
        tracing::info!(
            "Exported {} object(s) from '{}' in {}ms",
            report.exported(),
            database,
            report.duration_ms
        );
    }
    report
}

async fn export_kind(
    session: &mut dyn CatalogSession,
    database: &str,
    kind: ObjectKind,
    options: &ExportOptions,
    tracker: &mut LockedObjectTracker,
    counts: &mut KindExport,
) -> Result<()> {
    let objects = session.list_objects(kind).await?;
    counts.discovered = objects.len();

    if objects.is_empty() {
        tracing::info!("No {} found under the database '{}'.", kind.plural(), database);
        return Ok(());
    }

    let mut writer = ScriptWriter::new(options.object_folder(database, kind));

    for object in &objects {
        let generated_at = chrono::Local::now().naive_local();
        match render_object(session, database, object, generated_at).await {
            Ok(document) => {
                writer.write(&object.export_name(), &document.text()).await?;
                counts.exported = counts.exported.saturating_add(1);
                tracing::debug!("Exported {} {}", kind, object.qualified_name());
            }
            Err(e) if e.is_unreadable() => {
                tracing::warn!("Skipping {} {}: {}", kind, object.qualified_name(), e);
                if tracker.record(object.export_name()) {
                    counts.locked = counts.locked.saturating_add(1);
                }
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "Saved {} of {} {} to {}",
        counts.exported,
        counts.discovered,
        kind.plural(),
        writer.folder().display()
    );
    Ok(())
}

fn stage_of(error: &DbExportError) -> FailureStage {
    match error {
        DbExportError::DatabaseSelection { .. } => FailureStage::Selection,
        DbExportError::Io { .. } | DbExportError::Report { .. } => FailureStage::Output,
        _ => FailureStage::Catalog,
    }
}

fn failure(stage: FailureStage, error: &DbExportError) -> DatabaseFailure {
    DatabaseFailure {
        stage,
        error_message: describe(error),
    }
}

/// Error message followed by its source chain.
pub(crate) fn describe(error: &DbExportError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
