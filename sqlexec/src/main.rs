//! SQL Server script runner.
//!
//! Connects to a SQL Server instance, runs one script file as a single batch
//! and prints the result sets as tab-separated text on stdout.
//!
//! # Exit status
//! - 1 if the script cannot be read, the connection string is invalid, or
//!   the server cannot be reached
//! - 0 otherwise, including when the script itself fails; that error is
//!   printed to stdout

use anyhow::Context;
use clap::Parser;
use sqlexec::Cli;
use sqlexec_core::{
    ConnectionDescriptor, Database, ScriptConfig, ScriptRunner, init_logging, load_script,
};
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_verbosity(), cli.quiet) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let config = cli.to_config();
    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the whole pipeline. An `Err` here is fatal and ends the process
/// with status 1; script-level failures are printed and return `Ok`.
async fn run(config: &ScriptConfig) -> anyhow::Result<()> {
    if config.debug {
        let mut stdout = io::stdout().lock();
        config
            .write_debug_echo(&mut stdout)
            .context("Failed to write debug output")?;
    }

    let script = load_script(&config.filepath)
        .await
        .context("Cannot read script file")?;

    let descriptor =
        ConnectionDescriptor::from_config(config).context("Invalid connection settings")?;
    if config.debug {
        println!(" connString:{}", descriptor.as_str());
    }
    info!("Target: {config}");

    let mut database = Database::open(&descriptor).context("Open connection failed")?;

    let outcome = execute(&mut database, &script).await;

    if let Err(e) = database.close().await {
        debug!("Error while closing connection: {e}");
    }
    outcome
}

/// Probes the connection, then runs the script and reports its outcome.
async fn execute(database: &mut Database, script: &str) -> anyhow::Result<()> {
    database.ping().await.context("Cannot connect")?;

    let mut runner = ScriptRunner::new(BufWriter::new(io::stdout()));
    let result = runner.run(database, script).await;
    drop(runner);

    match result {
        Ok(summary) => info!(
            "Script finished: {} result set(s), {} row(s) printed, {} row(s) skipped",
            summary.result_sets, summary.rows_printed, summary.rows_skipped
        ),
        Err(e) => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{e}").context("Failed to write error output")?;
        }
    }

    Ok(())
}
