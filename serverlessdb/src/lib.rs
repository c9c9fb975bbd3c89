//! Command-line surface for serverlessdb.
//!
//! The binary in `main.rs` parses [`Cli`], sets up logging, and hands off to
//! [`run`]. Everything here is exposed for testing.

use clap::{Args, Parser, Subcommand};
use serverlessdb_core::{
    ConfigLoader, Configuration, Result, TriggerRequest,
    configuration::LoadedConfiguration,
    error::redact_database_url,
    provision::NOTIFY_CHANNEL,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Root command.
#[derive(Debug, Parser)]
#[command(name = "serverlessdb")]
#[command(about = concat!("Event-driven databases | ver: ", env!("CARGO_PKG_VERSION")))]
#[command(version)]
#[command(long_about = concat!(
    "Event-driven databases | ver: ",
    env!("CARGO_PKG_VERSION"),
    "

Installs a PostgreSQL trigger that publishes every inserted, updated or
deleted row as JSON on the 'events' notification channel.

CONFIGURATION:
  --config FILE, else ~/.serverlessdb (TOML), else NETLIFY_DATABASE_*
  environment variables. Keys: database.hostname, database.port,
  database.username, database.password, database.sslmodeon, database.dbname

EXAMPLES:
  serverlessdb add --table products
  serverlessdb --config ./db.toml add --table sales.orders --trigger orders_changed
  serverlessdb add --table products --dry-run
"
))]
pub struct Cli {
    /// Flags shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to run; none prints the database name
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Accepted for compatibility; has no effect
    #[arg(short, long)]
    pub toggle: bool,
}

/// Flags accepted by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Config file path
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "config file (default is $HOME/.serverlessdb)"
    )]
    pub config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Adds a trigger to a Postgresql table
    Add(AddArgs),
}

/// Arguments for `add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Trigger name
    #[arg(long, help = "Trigger name (default: <table>_notify_event)")]
    pub trigger: Option<String>,

    /// Table name
    #[arg(long, help = "Table name, optionally schema-qualified (default: products)")]
    pub table: Option<String>,

    /// Print statements instead of executing them
    #[arg(long, help = "Print the SQL that would run without connecting")]
    pub dry_run: bool,
}

impl AddArgs {
    /// Validated trigger/table pair.
    ///
    /// # Errors
    /// Returns an identifier error for unusable names.
    pub fn trigger_request(&self) -> Result<TriggerRequest> {
        TriggerRequest::new(self.trigger.as_deref(), self.table.as_deref())
    }
}

/// Resolves configuration for this invocation.
///
/// # Errors
/// See [`ConfigLoader::load`].
pub fn load_configuration(global: &GlobalArgs) -> Result<LoadedConfiguration> {
    let loader = match &global.config {
        Some(path) => ConfigLoader::new().with_config_file(path),
        None => ConfigLoader::new(),
    };
    loader.load()
}

/// Runs the selected command with an already loaded configuration.
///
/// # Errors
/// Invalid names, connection failures and failed statements.
pub async fn run(cli: &Cli, configuration: &Configuration) -> Result<()> {
    if cli.toggle {
        debug!("--toggle has no effect");
    }

    match &cli.command {
        None => {
            println!("{}", configuration.database.db_name);
            Ok(())
        }
        Some(Command::Add(args)) => add(configuration, args).await,
    }
}

/// Text printed by `add --dry-run`.
///
/// # Errors
/// Fails if the connection URL cannot be built.
pub fn render_dry_run(configuration: &Configuration, request: &TriggerRequest) -> Result<String> {
    let url = configuration.database.connection_url()?;
    let mut out = format!("-- target: {}\n", redact_database_url(&url));
    for (stage, sql) in request.statements() {
        out.push_str(&format!("\n-- {}\n{}\n", stage, sql));
    }
    Ok(out)
}

async fn add(configuration: &Configuration, args: &AddArgs) -> Result<()> {
    let request = args.trigger_request()?;

    if args.dry_run {
        print!("{}", render_dry_run(configuration, &request)?);
        return Ok(());
    }

    info!(
        "Adding trigger '{}' to table '{}' on {}",
        request.trigger(),
        request.table(),
        configuration.database
    );

    execute(configuration, &request).await?;

    info!(
        "✓ Row changes on '{}' are published to channel '{}'",
        request.table(),
        NOTIFY_CHANNEL
    );
    Ok(())
}

#[cfg(feature = "postgresql")]
async fn execute(configuration: &Configuration, request: &TriggerRequest) -> Result<()> {
    serverlessdb_core::provision_postgres(&configuration.database, request, |outcome| {
        println!("{}", outcome);
    })
    .await
    .map(|_| ())
    .inspect_err(|e| {
        if e.is_duplicate_object() {
            warn!(
                "Trigger '{}' already exists on '{}'",
                request.trigger(),
                request.table()
            );
        }
    })
}

#[cfg(not(feature = "postgresql"))]
async fn execute(_configuration: &Configuration, _request: &TriggerRequest) -> Result<()> {
    Err(serverlessdb_core::ServerlessDbError::configuration(
        "PostgreSQL support not available. Compile with --features postgresql",
    ))
}
