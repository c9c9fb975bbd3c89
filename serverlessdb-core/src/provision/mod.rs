//! Installs the change-notification function and trigger.
//!
//! # Module Structure
//! - `sql`: statement text and identifier handling
//! - `executor`: the `StatementExecutor` seam
//! - `postgres`: sqlx implementation over one `PgConnection`
//!
//! The two statements run in order on one connection. A failing function
//! creation means the trigger is never attempted. Nothing is rolled back.
//! The connection is closed exactly once on every path.

mod executor;
#[cfg(feature = "postgresql")]
mod postgres;
mod sql;

pub use executor::StatementExecutor;
#[cfg(feature = "postgresql")]
pub use postgres::PgStatementExecutor;
pub use sql::{
    DEFAULT_TABLE, Identifier, NOTIFY_CHANNEL, NOTIFY_FUNCTION_NAME, NOTIFY_FUNCTION_SQL,
    TRIGGER_NAME_SUFFIX, TableName, TriggerRequest,
};

use crate::Result;
use crate::error::{ProvisionStage, ServerlessDbError};
use tracing::{debug, error, info, warn};

/// Result summary of one executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOutcome {
    /// Which statement ran
    pub stage: ProvisionStage,
    /// Rows affected as reported by the server (0 for DDL)
    pub rows_affected: u64,
}

impl std::fmt::Display for StatementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let command = match self.stage {
            ProvisionStage::FunctionCreation => "CREATE FUNCTION",
            ProvisionStage::TriggerCreation => "CREATE TRIGGER",
        };
        write!(f, "{} (rows affected: {})", command, self.rows_affected)
    }
}

/// Outcomes of a completed provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// `notify_event()` creation
    pub function: StatementOutcome,
    /// Trigger creation
    pub trigger: StatementOutcome,
}

/// Runs both statements, then closes the executor.
///
/// `on_outcome` is called right after each statement succeeds, so a
/// function-creation result is reported even if the trigger then fails.
///
/// # Errors
/// Returns [`ServerlessDbError::Statement`] naming the failed stage. A close
/// failure after successful statements is logged, not returned.
pub async fn provision<E, F>(
    mut executor: E,
    request: &TriggerRequest,
    mut on_outcome: F,
) -> Result<ProvisionReport>
where
    E: StatementExecutor,
    F: FnMut(&StatementOutcome),
{
    let result = install(&mut executor, request, &mut on_outcome).await;

    if let Err(e) = executor.close().await {
        warn!("Failed to close database connection: {}", e);
    }

    result
}

async fn install<E, F>(
    executor: &mut E,
    request: &TriggerRequest,
    on_outcome: &mut F,
) -> Result<ProvisionReport>
where
    E: StatementExecutor,
    F: FnMut(&StatementOutcome),
{
    let [(function_stage, function_sql), (trigger_stage, trigger_sql)] = request.statements();

    let function = run_statement(executor, function_stage, &function_sql).await?;
    on_outcome(&function);

    let trigger = run_statement(executor, trigger_stage, &trigger_sql).await?;
    on_outcome(&trigger);

    info!(
        "Trigger '{}' on '{}' publishes to channel '{}'",
        request.trigger(),
        request.table(),
        NOTIFY_CHANNEL
    );

    Ok(ProvisionReport { function, trigger })
}

async fn run_statement<E>(
    executor: &mut E,
    stage: ProvisionStage,
    sql: &str,
) -> Result<StatementOutcome>
where
    E: StatementExecutor,
{
    debug!("Executing {}:\n{}", stage, sql);

    let rows_affected = executor.execute(sql).await.map_err(|source| {
        error!("{} failed: {}", stage, source);
        ServerlessDbError::statement_failed(stage, source)
    })?;

    Ok(StatementOutcome {
        stage,
        rows_affected,
    })
}

/// Connects with `config` and provisions `request` over that connection.
///
/// # Errors
/// Connection errors, or the first failing statement.
#[cfg(feature = "postgresql")]
pub async fn provision_postgres<F>(
    config: &crate::configuration::DatabaseConfig,
    request: &TriggerRequest,
    on_outcome: F,
) -> Result<ProvisionReport>
where
    F: FnMut(&StatementOutcome),
{
    let executor = PgStatementExecutor::connect(config).await?;
    provision(executor, request, on_outcome).await
}
