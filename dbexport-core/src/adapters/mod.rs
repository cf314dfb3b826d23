//! Catalog access for the export pipeline.
//!
//! The pipeline talks to the server only through [`CatalogSession`], an
//! object-safe trait over one live session. The SQL Server implementation
//! lives in [`mssql`]; tests drive the pipeline with in-memory sessions.
//!
//! # Module Structure
//! - `config`: Connection configuration (`ServerAddress`, `ConnectionConfig`)
//! - `mssql`: tiberius-backed SQL Server session

use crate::Result;
use crate::models::{ColumnDescriptor, ObjectDescriptor, ObjectKind};
use crate::security::Credentials;
use async_trait::async_trait;

pub mod config;
pub mod mssql;

pub use config::{ConnectionConfig, DEFAULT_PORT, ServerAddress};

/// One authenticated session against a database server.
///
/// The session is used serially by a single caller: every method completes
/// before the next one is issued.
///
/// # Error contract
/// Implementations return
/// [`DbExportError::ObjectUnreadable`](crate::DbExportError::ObjectUnreadable)
/// from [`function_source`](Self::function_source) and
/// [`table_columns`](Self::table_columns) when the server will not expose an
/// object's definition. Every other error aborts the current database pass.
#[async_trait]
pub trait CatalogSession: Send {
    /// Switches the session's database context.
    ///
    /// # Errors
    /// Returns `DatabaseSelection` if the database is missing or inaccessible
    async fn use_database(&mut self, database: &str) -> Result<()>;

    /// Lists exportable objects of one class in the current database,
    /// in the order the server returns them.
    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<ObjectDescriptor>>;

    /// Source text fragments of a function, in fetch order.
    async fn function_source(&mut self, object: &ObjectDescriptor) -> Result<Vec<String>>;

    /// Column metadata of a table, in ordinal order.
    async fn table_columns(&mut self, object: &ObjectDescriptor) -> Result<Vec<ColumnDescriptor>>;

    /// Closes the session. Further calls fail.
    async fn close(&mut self) -> Result<()>;

    /// Description for logging (no credentials).
    fn safe_description(&self) -> String;
}

/// Opens a SQL Server session.
///
/// # Errors
/// Returns `Connectivity` when the server cannot be reached and
/// `Authentication` when the login or handshake is rejected
pub async fn open_session(
    connection: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<Box<dyn CatalogSession>> {
    connection.validate()?;
    let session = mssql::SqlServerSession::connect(connection, credentials).await?;
    Ok(Box::new(session))
}
