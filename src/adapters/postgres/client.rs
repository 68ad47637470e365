//! PostgreSQL connection pooling
//!
//! Shared pool plumbing for the source and destination adapters. TLS is
//! negotiated per the connection string's sslmode; the connector is
//! always available so `sslmode=require` works out of the box.

use crate::config::SecretString;
use crate::domain::{Result, VeilError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;

/// Pooled PostgreSQL client
///
/// Provides connection management for one database; query logic lives in
/// the source and destination adapters built on top.
pub struct PgClient {
    /// Connection pool
    pool: Pool,

    /// Schema queried/written by the owning adapter
    schema: String,
}

impl PgClient {
    /// Create a new pooled client
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable connection
    /// string, or a connectivity error if the pool cannot be built.
    pub fn new(
        connection_string: &SecretString,
        schema: impl Into<String>,
        max_connections: usize,
        connection_timeout_seconds: u64,
    ) -> Result<Self> {
        let pg_config: tokio_postgres::Config =
            connection_string.expose_secret().parse().map_err(|e| {
                VeilError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| VeilError::Connectivity(format!("Failed to build TLS connector: {e}")))?;
        let connector = MakeTlsConnector::new(tls);

        let manager = Manager::from_config(
            pg_config,
            connector,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .runtime(Runtime::Tokio1)
            .max_size(max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| VeilError::Database(format!("Failed to create connection pool: {e}")))?;

        Ok(Self {
            pool,
            schema: schema.into(),
        })
    }

    /// The schema this client operates in
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Pool exhaustion and unreachable servers surface as connectivity
    /// errors, which the retry layer treats as transient.
    pub async fn get(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| VeilError::Connectivity(format!("Failed to get connection from pool: {e}")))
    }

    /// Test the connection by executing a trivial query
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| VeilError::Connectivity(format!("Connection test failed: {e}")))?;
        Ok(())
    }

    /// Quote an identifier for safe interpolation into DDL/DML.
    ///
    /// Identifiers come from the validated dictionary, not from data,
    /// but quoting keeps mixed-case and reserved-word names working.
    pub fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Fully qualified, quoted table reference in this client's schema
    pub fn qualified(&self, table: &str) -> String {
        format!(
            "{}.{}",
            Self::quote_ident(&self.schema),
            Self::quote_ident(table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(PgClient::quote_ident("patients"), "\"patients\"");
        assert_eq!(PgClient::quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_invalid_connection_string_rejected() {
        let secret = crate::config::secret_string("not a connection string".to_string());
        let result = PgClient::new(&secret, "public", 4, 5);
        assert!(matches!(result, Err(VeilError::Configuration(_))));
    }
}
