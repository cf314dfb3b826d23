//! TDS session setup.
//!
//! A failure before the login packet is answered (DNS, TCP, SQL Browser,
//! TLS, timeout) is a connectivity problem; a failure after it is an
//! authentication or driver problem.

use crate::adapters::ConnectionConfig;
use crate::error::DbExportError;
use crate::security::Credentials;
use crate::Result;
use tiberius::{AuthMethod, Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Client type used by the session.
pub type TdsClient = Client<Compat<TcpStream>>;

/// Port of the SQL Browser service used to resolve named instances.
const SQL_BROWSER_PORT: u16 = 1434;

/// Builds the tiberius configuration.
pub(super) fn tiberius_config(connection: &ConnectionConfig, credentials: &Credentials) -> Config {
    let server = &connection.server;
    let mut config = Config::new();
    config.host(&server.host);

    match (&server.instance, server.port) {
        (_, Some(port)) => config.port(port),
        (Some(instance), None) => {
            config.instance_name(instance);
            config.port(SQL_BROWSER_PORT);
        }
        (None, None) => config.port(server.effective_port()),
    }

    config.authentication(AuthMethod::sql_server(
        credentials.username(),
        credentials.password(),
    ));
    config.application_name(&connection.application_name);

    if connection.trust_certificate {
        config.trust_cert();
    }

    config
}

/// Opens the TCP stream and performs the login handshake.
pub(super) async fn connect(
    connection: &ConnectionConfig,
    credentials: &Credentials,
) -> Result<TdsClient> {
    let config = tiberius_config(connection, credentials);
    let named = connection.server.instance.is_some() && connection.server.port.is_none();
    let target = connection.server.to_string();

    tracing::debug!("Connecting to {}", target);

    let attempt = async {
        let tcp = if named {
            TcpStream::connect_named(&config).await.map_err(|e| {
                DbExportError::connectivity(format!("resolving instance {}", target), e)
            })?
        } else {
            TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| DbExportError::connectivity(format!("tcp connect to {}", target), e))?
        };

        tcp.set_nodelay(true)
            .map_err(|e| DbExportError::connectivity("configuring the socket", e))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| classify_connect_error(&target, e))
    };

    match tokio::time::timeout(connection.connect_timeout, attempt).await {
        Ok(result) => result,
        Err(elapsed) => Err(DbExportError::connectivity(
            format!(
                "no response from {} within {:?}",
                target, connection.connect_timeout
            ),
            elapsed,
        )),
    }
}

/// Sorts a handshake error into the connectivity or authentication bucket.
fn classify_connect_error(target: &str, error: tiberius::error::Error) -> DbExportError {
    use tiberius::error::Error;

    match error {
        Error::Io { .. } | Error::Tls { .. } | Error::Routing { .. } => {
            DbExportError::connectivity(format!("handshake with {}", target), error)
        }
        other => DbExportError::authentication(format!("login to {}", target), other),
    }
}
