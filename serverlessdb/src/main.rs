//! serverlessdb: event-driven databases.
//!
//! Installs a `notify_event()` trigger on a PostgreSQL table so that every
//! row change is published as JSON on the `events` channel.
//!
//! Exit codes: 0 on success, 1 on command-line, configuration or database
//! errors.

use clap::Parser;
use clap::error::ErrorKind;
use serverlessdb::{Cli, load_configuration, run};
use serverlessdb_core::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let loaded = match load_configuration(&cli.global) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &loaded.configuration).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
