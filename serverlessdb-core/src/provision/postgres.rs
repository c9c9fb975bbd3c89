//! sqlx-backed executor holding exactly one `PgConnection`.

use super::executor::StatementExecutor;
use crate::configuration::DatabaseConfig;
use crate::error::{BoxError, redact_database_url};
use crate::{Result, ServerlessDbError};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use std::str::FromStr;
use tracing::{debug, error, info};

/// Single PostgreSQL connection used for provisioning.
pub struct PgStatementExecutor {
    conn: PgConnection,
}

impl std::fmt::Debug for PgStatementExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStatementExecutor").finish_non_exhaustive()
    }
}

impl PgStatementExecutor {
    /// Opens a connection using the configured host, port, credentials,
    /// database and SSL mode.
    ///
    /// # Errors
    /// Returns a connection error if the URL cannot be built or the server
    /// cannot be reached. The password never appears in the error.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url()?;
        info!("Connecting to {}", redact_database_url(&url));

        let options =
            PgConnectOptions::from_str(&url).map_err(ServerlessDbError::connection_failed)?;

        let conn = PgConnection::connect_with(&options).await.map_err(|e| {
            error!("Failed to connect to {}: {}", config, e);
            ServerlessDbError::connection_failed(e)
        })?;

        debug!("Connected to {}", config);
        Ok(Self { conn })
    }
}

#[async_trait]
impl StatementExecutor for PgStatementExecutor {
    async fn execute(&mut self, sql: &str) -> std::result::Result<u64, BoxError> {
        let result = Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn close(self) -> std::result::Result<(), BoxError> {
        self.conn.close().await?;
        debug!("Database connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_boxable_executor<E: StatementExecutor + Send + 'static>() {}

    #[test]
    fn test_pg_executor_implements_statement_executor() {
        assert_boxable_executor::<PgStatementExecutor>();
    }

    #[tokio::test]
    async fn test_connect_refused_reports_cause() {
        let mut config = DatabaseConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = 1;

        let err = PgStatementExecutor::connect(&config).await.unwrap_err();

        assert!(matches!(err, ServerlessDbError::Connection { .. }));
        let message = err.to_string();
        assert!(message.starts_with("Database connection failed: "));
        assert_ne!(message, "Database connection failed: Database connection failed");
    }
}
