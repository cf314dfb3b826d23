//! Script file output.

use crate::error::DbExportError;
use crate::Result;
use std::path::{Path, PathBuf};

/// Characters that cannot appear in file names on common filesystems.
pub const UNSAFE_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extension of exported scripts.
pub const SCRIPT_EXTENSION: &str = "sql";

/// Replaces every filesystem-unsafe character with `_`.
///
/// Distinct names can map to the same file name; the later export
/// overwrites the earlier one.
///
/// # Example
/// ```rust
/// use dbexport_core::export::sanitize_filename;
///
/// assert_eq!(sanitize_filename("fn<calc>:v2"), "fn_calc__v2");
/// assert_eq!(sanitize_filename("fn_plain"), "fn_plain");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Writes scripts into one output folder, creating it on first use.
#[derive(Debug)]
pub struct ScriptWriter {
    folder: PathBuf,
    created: bool,
}

impl ScriptWriter {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            created: false,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path a given object name is written to.
    pub fn script_path(&self, object_name: &str) -> PathBuf {
        self.folder
            .join(format!("{}.{}", sanitize_filename(object_name), SCRIPT_EXTENSION))
    }

    /// Creates or overwrites `<folder>/<sanitized-name>.sql`.
    ///
    /// # Errors
    /// Returns `Io` if the folder cannot be created or the file cannot be written
    pub async fn write(&mut self, object_name: &str, contents: &str) -> Result<PathBuf> {
        if !self.created {
            tokio::fs::create_dir_all(&self.folder).await.map_err(|e| {
                DbExportError::io(format!("Failed to create {}", self.folder.display()), e)
            })?;
            self.created = true;
        }

        let path = self.script_path(object_name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| DbExportError::io(format!("Failed to write to {}", path.display()), e))?;

        tracing::trace!("Wrote {}", path.display());
        Ok(path)
    }
}
