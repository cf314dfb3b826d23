//! Core data models for exported catalog objects and run results.

use crate::error::DbExportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema whose objects are exported under their bare name.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Object classes that can be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Scalar user-defined function (`sys.objects` type `FN`)
    Function,
    /// User table (`sys.tables`)
    Table,
}

impl ObjectKind {
    /// All exportable classes, in export order.
    pub const ALL: [Self; 2] = [Self::Function, Self::Table];

    /// Singular label used in the script header (`Function`, `Table`).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Table => "Table",
        }
    }

    /// Plural label used in folder names and messages (`Functions`, `Tables`).
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Function => "Functions",
            Self::Table => "Tables",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Table => write!(f, "table"),
        }
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = DbExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "function" | "functions" | "fn" => Ok(Self::Function),
            "table" | "tables" => Ok(Self::Table),
            other => Err(DbExportError::configuration(format!(
                "unknown object type '{}' (expected 'function' or 'table')",
                other
            ))),
        }
    }
}

/// A catalog object selected for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
}

impl ObjectDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }

    /// Bracket-quoted `[schema].[name]`.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }

    /// Name used for the script file and the locked-object report.
    ///
    /// Objects in `dbo` keep their bare name; any other schema is
    /// prefixed, so `archive.fn_Calc` and `fn_Calc` never collide.
    pub fn export_name(&self) -> String {
        if self.schema.is_empty() || self.schema.eq_ignore_ascii_case(DEFAULT_SCHEMA) {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

/// Column metadata as reported by `INFORMATION_SCHEMA.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    /// `CHARACTER_MAXIMUM_LENGTH`; `-1` means `MAX`
    pub max_length: Option<i32>,
    pub is_nullable: bool,
}

/// Types whose declaration carries a length argument.
const SIZED_TYPES: [&str; 6] = ["char", "varchar", "nchar", "nvarchar", "binary", "varbinary"];

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        max_length: Option<i32>,
        is_nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length,
            is_nullable,
        }
    }

    /// Type as written in DDL, e.g. `nvarchar(50)`, `varbinary(MAX)`, `int`.
    pub fn type_clause(&self) -> String {
        let sized = SIZED_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&self.data_type));
        match self.max_length {
            Some(-1) if sized => format!("{}(MAX)", self.data_type),
            Some(len) if sized => format!("{}({})", self.data_type, len),
            _ => self.data_type.clone(),
        }
    }

    /// `NULL` or `NOT NULL`.
    pub const fn nullability(&self) -> &'static str {
        if self.is_nullable { "NULL" } else { "NOT NULL" }
    }
}

/// Header plus body of one exported script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub header: String,
    pub body: String,
}

impl RenderedDocument {
    /// Full file contents.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.header.len().saturating_add(self.body.len()));
        text.push_str(&self.header);
        text.push_str(&self.body);
        text
    }
}

/// An object whose definition the server refused to return.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockedObject {
    pub database: String,
    pub object_name: String,
}

/// Stage at which a database pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// `USE` failed; nothing else was attempted
    Selection,
    /// Enumeration or definition retrieval failed
    Catalog,
    /// Writing a script or the report failed
    Output,
}

/// Information about a failed database pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseFailure {
    pub stage: FailureStage,
    pub error_message: String,
}

/// Per-class export counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindExport {
    pub kind: ObjectKind,
    /// Objects returned by the catalog query
    pub discovered: usize,
    /// Scripts written
    pub exported: usize,
    /// Objects routed to the locked report
    pub locked: usize,
}

/// Outcome of one database pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseReport {
    pub database: String,
    pub kinds: Vec<KindExport>,
    pub locked_objects: Vec<String>,
    pub locked_report: Option<PathBuf>,
    pub failure: Option<DatabaseFailure>,
    pub duration_ms: u64,
}

impl DatabaseReport {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            kinds: Vec::new(),
            locked_objects: Vec::new(),
            locked_report: None,
            failure: None,
            duration_ms: 0,
        }
    }

    /// Locked objects alone do not make a pass unsuccessful.
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Total scripts written across all classes.
    pub fn exported(&self) -> usize {
        self.kinds.iter().map(|k| k.exported).sum()
    }
}

/// Result of a whole export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub connected: bool,
    /// Set when the run configuration was rejected before connecting
    #[serde(default)]
    pub configuration_error: Option<String>,
    /// Set when the connection could not be established
    pub connection_error: Option<String>,
    pub databases: Vec<DatabaseReport>,
    pub success: bool,
    pub tool_version: String,
}

impl RunSummary {
    /// Process exit status for this run.
    pub const fn exit_code(&self) -> u8 {
        if self.success { 0 } else { 1 }
    }

    /// Elapsed time in seconds, for the closing message.
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

/// Quotes a SQL Server identifier with brackets, doubling any `]`.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}
