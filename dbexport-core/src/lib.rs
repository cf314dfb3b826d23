//! Core library for dbexport.
//!
//! Exports the definitions of scalar functions and tables from SQL Server
//! databases into per-object `.sql` scripts, recording objects whose text the
//! server refuses to return in a per-database reference report.
//!
//! # Security Guarantees
//! - Passwords live only in zeroizing containers and never appear in logs or errors
//! - All database operations are read-only (`USE`, catalog `SELECT`, `sp_helptext`)
//!
//! # Architecture
//! - `adapters`: the [`CatalogSession`] seam and its tiberius implementation
//! - `export`: rendering, writing, locked-object tracking and orchestration
//! - `models`: object, report and summary types
//! - `logging`: tracing subscriber setup shared by the binary and tests

pub mod adapters;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod security;

// Re-export commonly used types
pub use adapters::{CatalogSession, ConnectionConfig, ServerAddress, open_session};
pub use error::{DbExportError, Result};
pub use export::{ExportConfig, ExportOptions, export_database, run, run_export};
pub use models::{
    ColumnDescriptor, DatabaseFailure, DatabaseReport, FailureStage, KindExport, LockedObject,
    ObjectDescriptor, ObjectKind, RenderedDocument, RunSummary,
};
pub use security::Credentials;
