//! SQL Server catalog session backed by tiberius.
//!
//! # Module Structure
//! - `connection`: TDS session setup and connect-error classification
//! - `catalog`: catalog queries, row decoding, retrieval-error classification
//!
//! All statements are read-only: `USE`, `SELECT` against catalog views and
//! `sp_helptext`.

mod catalog;
mod connection;

use super::{CatalogSession, ConnectionConfig};
use crate::error::DbExportError;
use crate::models::{ColumnDescriptor, ObjectDescriptor, ObjectKind};
use crate::security::Credentials;
use crate::Result;
use async_trait::async_trait;

pub use catalog::{UNREADABLE_ERROR_CODES, is_unreadable_code};
pub use connection::TdsClient;

/// One open TDS session.
pub struct SqlServerSession {
    client: Option<TdsClient>,
    config: ConnectionConfig,
}

impl std::fmt::Debug for SqlServerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerSession")
            .field("server", &self.config.server)
            .field("open", &self.client.is_some())
            .finish()
    }
}

impl SqlServerSession {
    /// Connects and logs in.
    ///
    /// # Errors
    /// Returns `Connectivity` or `Authentication` depending on where the attempt failed
    pub async fn connect(config: &ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        let client = connection::connect(config, credentials).await?;
        Ok(Self {
            client: Some(client),
            config: config.clone(),
        })
    }

    fn client(&mut self) -> Result<&mut TdsClient> {
        self.client
            .as_mut()
            .ok_or_else(|| DbExportError::configuration("SQL Server session is already closed"))
    }
}

#[async_trait]
impl CatalogSession for SqlServerSession {
    async fn use_database(&mut self, database: &str) -> Result<()> {
        let client = self.client()?;
        catalog::use_database(client, database).await
    }

    async fn list_objects(&mut self, kind: ObjectKind) -> Result<Vec<ObjectDescriptor>> {
        let client = self.client()?;
        catalog::list_objects(client, kind).await
    }

    async fn function_source(&mut self, object: &ObjectDescriptor) -> Result<Vec<String>> {
        let client = self.client()?;
        catalog::function_source(client, object).await
    }

    async fn table_columns(&mut self, object: &ObjectDescriptor) -> Result<Vec<ColumnDescriptor>> {
        let client = self.client()?;
        catalog::table_columns(client, object).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DbExportError::connectivity("closing the session", e))?;
        }
        Ok(())
    }

    fn safe_description(&self) -> String {
        format!("SQL Server session ({})", self.config.server)
    }
}
