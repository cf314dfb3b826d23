//! Export run configuration.
//!
//! [`ExportConfig`] is the explicit configuration object handed to the
//! orchestrator: connection settings, credentials, the ordered database
//! list and the output options. The CLI builds it from flags and
//! environment variables; tests build it directly.

use crate::adapters::ConnectionConfig;
use crate::error::DbExportError;
use crate::models::ObjectKind;
use crate::security::Credentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the folder holding locked-object reports.
pub const DEFAULT_REFERENCE_DIR: &str = "Reference";

/// Where and what to export, independent of how the server is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Object classes exported for every database, in order
    pub object_kinds: Vec<ObjectKind>,
    /// Root under which `<database>_<Kind>` folders are created
    pub output_dir: PathBuf,
    /// Folder for locked-object reports; relative paths resolve against `output_dir`
    pub reference_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            object_kinds: ObjectKind::ALL.to_vec(),
            output_dir: PathBuf::from("."),
            reference_dir: PathBuf::from(DEFAULT_REFERENCE_DIR),
        }
    }
}

impl ExportOptions {
    /// Creates options with defaults: both classes, current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the exported object classes.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn with_object_kinds(mut self, kinds: impl IntoIterator<Item = ObjectKind>) -> Self {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        self.object_kinds = unique;
        self
    }

    /// Builder method to set the output root.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the reference folder.
    pub fn with_reference_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reference_dir = dir.into();
        self
    }

    /// Folder receiving the scripts of one database and class, e.g. `Sales_Functions`.
    pub fn object_folder(&self, database: &str, kind: ObjectKind) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}",
            crate::export::writer::sanitize_filename(database),
            kind.plural()
        ))
    }

    /// Resolved reference folder.
    pub fn reference_folder(&self) -> PathBuf {
        if self.reference_dir.is_absolute() {
            self.reference_dir.clone()
        } else {
            self.output_dir.join(&self.reference_dir)
        }
    }

    /// Validates option values.
    ///
    /// # Errors
    /// Returns error if no object class is selected or a path is empty
    pub fn validate(&self) -> crate::Result<()> {
        if self.object_kinds.is_empty() {
            return Err(DbExportError::configuration(
                "at least one object type must be selected",
            ));
        }

        if is_empty_path(&self.output_dir) || is_empty_path(&self.reference_dir) {
            return Err(DbExportError::configuration(
                "output and reference directories cannot be empty",
            ));
        }

        Ok(())
    }
}

fn is_empty_path(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Complete configuration of one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub connection: ConnectionConfig,
    pub credentials: Credentials,
    /// Databases exported in this order
    pub databases: Vec<String>,
    pub options: ExportOptions,
}

impl ExportConfig {
    /// Creates a configuration with default export options.
    pub fn new(
        connection: ConnectionConfig,
        credentials: Credentials,
        databases: Vec<String>,
    ) -> Self {
        Self {
            connection,
            credentials,
            databases,
            options: ExportOptions::default(),
        }
    }

    /// Builder method to replace the export options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the whole configuration before connecting.
    ///
    /// # Errors
    /// Returns error if any part is invalid or the database list is empty
    pub fn validate(&self) -> crate::Result<()> {
        self.connection.validate()?;
        self.options.validate()?;

        if self.credentials.username().is_empty() {
            return Err(DbExportError::configuration("a SQL login username is required"));
        }

        if self.databases.is_empty() {
            return Err(DbExportError::configuration(
                "at least one database must be configured",
            ));
        }

        if self.databases.iter().any(|db| db.trim().is_empty()) {
            return Err(DbExportError::configuration("database names cannot be blank"));
        }

        Ok(())
    }
}
