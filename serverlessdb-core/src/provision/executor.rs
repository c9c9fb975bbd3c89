//! Seam between the provisioning steps and the database driver.

use crate::error::BoxError;
use async_trait::async_trait;

/// Runs provisioning statements over a single database connection.
///
/// `close` takes the executor by value, so a connection can be released at
/// most once.
#[async_trait]
pub trait StatementExecutor: Send {
    /// Executes one statement and returns the number of rows it affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, BoxError>;

    /// Releases the underlying connection.
    async fn close(self) -> Result<(), BoxError>;
}
