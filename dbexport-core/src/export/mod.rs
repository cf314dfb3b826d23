//! Export pipeline.
//!
//! # Module Structure
//! - `config`: Run configuration (`ExportConfig`, `ExportOptions`)
//! - `render`: Header and body rendering
//! - `writer`: Filename sanitization and script output
//! - `tracker`: Locked-object collection and the CSV reference report
//! - `pipeline`: One database pass
//! - `orchestrator`: Connection lifecycle and the run summary

pub mod config;
pub mod orchestrator;
pub mod pipeline;
pub mod render;
pub mod tracker;
pub mod writer;

pub use config::{DEFAULT_REFERENCE_DIR, ExportConfig, ExportOptions};
pub use orchestrator::{run, run_export};
pub use pipeline::export_database;
pub use render::{render_create_table, render_header, render_object};
pub use tracker::LockedObjectTracker;
pub use writer::{ScriptWriter, sanitize_filename};
