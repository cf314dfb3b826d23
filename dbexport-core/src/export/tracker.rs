//! Locked-object tracking and the reference report.

use crate::error::DbExportError;
use crate::export::writer::sanitize_filename;
use crate::models::LockedObject;
use crate::Result;
use std::path::{Path, PathBuf};

/// Suffix of the per-database report file.
pub const LOCKED_REPORT_SUFFIX: &str = "_Locked_Objects.csv";

/// Column headers of the report.
pub const LOCKED_REPORT_HEADERS: [&str; 2] = ["Database", "Object Name"];

/// Collects objects whose definitions the server would not return during
/// one database pass.
#[derive(Debug, Clone)]
pub struct LockedObjectTracker {
    database: String,
    entries: Vec<LockedObject>,
}

impl LockedObjectTracker {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            entries: Vec::new(),
        }
    }

    /// Records an object by its export name (schema-qualified outside
    /// `dbo`). Returns `false` when the name was already recorded.
    pub fn record(&mut self, object_name: impl Into<String>) -> bool {
        let entry = LockedObject {
            database: self.database.clone(),
            object_name: object_name.into(),
        };
        if self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Recorded object names in detection order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.object_name.clone()).collect()
    }

    /// Report location inside `reference_folder`.
    pub fn report_path(&self, reference_folder: &Path) -> PathBuf {
        reference_folder.join(format!(
            "{}{}",
            sanitize_filename(&self.database),
            LOCKED_REPORT_SUFFIX
        ))
    }

    /// Writes the report if anything was recorded.
    ///
    /// Returns the written path, or `None` when there was nothing to report.
    ///
    /// # Errors
    /// Returns `Report` if the CSV cannot be encoded and `Io` if the folder
    /// or file cannot be written
    pub async fn flush(&self, reference_folder: &Path) -> Result<Option<PathBuf>> {
        if self.entries.is_empty() {
            return Ok(None);
        }

        let contents = self.to_csv()?;

        tokio::fs::create_dir_all(reference_folder).await.map_err(|e| {
            DbExportError::io(format!("Failed to create {}", reference_folder.display()), e)
        })?;

        let path = self.report_path(reference_folder);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| DbExportError::io(format!("Failed to write to {}", path.display()), e))?;

        tracing::warn!(
            "Locked or encrypted objects found in '{}'. See {}",
            self.database,
            path.display()
        );
        Ok(Some(path))
    }

    fn to_csv(&self) -> Result<Vec<u8>> {
        let report_error = |source: csv::Error| DbExportError::Report {
            context: format!("encoding locked objects for '{}'", self.database),
            source,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(LOCKED_REPORT_HEADERS).map_err(report_error)?;
        for entry in &self.entries {
            writer
                .write_record([entry.database.as_str(), entry.object_name.as_str()])
                .map_err(report_error)?;
        }

        writer
            .into_inner()
            .map_err(|e| report_error(csv::Error::from(e.into_error())))
    }
}
