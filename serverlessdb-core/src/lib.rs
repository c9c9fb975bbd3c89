//! Core library for serverlessdb.
//!
//! serverlessdb turns a PostgreSQL table into an event source: it installs a
//! `notify_event()` trigger function that publishes every inserted, updated
//! or deleted row as JSON on the `events` channel, and binds it to a table
//! with an AFTER ROW trigger.
//!
//! # Security Guarantees
//! - The database password is held in zeroizing storage
//! - Connection URLs are redacted before they reach logs or errors
//! - Table and trigger names are emitted as quoted identifiers
//!
//! # Architecture
//! - `configuration`: config file / environment loading into an explicit value
//! - `provision`: statement generation and execution over one connection
//! - `notification`: the payload published to listeners

pub mod configuration;
pub mod error;
pub mod logging;
pub mod notification;
pub mod provision;
pub mod security;

// Re-export commonly used types
pub use configuration::{ConfigLoader, ConfigSource, Configuration, DatabaseConfig};
pub use error::{ProvisionStage, Result, ServerlessDbError};
pub use logging::init_logging;
pub use notification::{NotificationPayload, RowAction};
pub use provision::{ProvisionReport, StatementExecutor, StatementOutcome, TriggerRequest, provision};

#[cfg(feature = "postgresql")]
pub use provision::{PgStatementExecutor, provision_postgres};
