//! Command-line interface for sqlexec.
//!
//! The CLI definition lives here so it can be exercised by tests; the
//! binary entry point is in main.rs.

use clap::Parser;
use sqlexec_core::ScriptConfig;
use sqlexec_core::config::{DEFAULT_DIAL_TIMEOUT_SECS, DEFAULT_PORT};

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "sqlexec")]
#[command(about = "Run a SQL script file against SQL Server and print tab-separated results")]
#[command(version)]
#[command(long_about = "
sqlexec - run a SQL script against Microsoft SQL Server

The whole file is sent to the server as a single batch. Every result set is
printed to stdout as a tab-separated header line followed by one line per row.
NULL prints as NULL, bit as 1/0, and date/time values as YYYYMMDD HH:MM:SS.fff.

Failing to read the file or to reach the server exits with status 1. Errors
raised by the script itself are printed to stdout and the exit status is 0.

WARNING: --debug prints every parameter, including the password, to stdout.

EXAMPLES:
  sqlexec --server db1 --user sa --password secret --filepath report.sql
  sqlexec --server db1 --port 14330 --database sales --dialTimeout 10 --filepath fix.sql
")]
pub struct Cli {
    /// Enable debugging
    #[arg(long, help = "Echo parameters and diagnostics, including the password")]
    pub debug: bool,

    /// Database server
    #[arg(long, env = "SQLEXEC_SERVER", default_value = "", help = "The database server")]
    pub server: String,

    /// Database user
    #[arg(long, env = "SQLEXEC_USER", default_value = "", help = "The database user")]
    pub user: String,

    /// Database password
    #[arg(
        long,
        env = "SQLEXEC_PASSWORD",
        hide_env_values = true,
        default_value = "",
        help = "The database password"
    )]
    pub password: String,

    /// Server port
    #[arg(long, default_value_t = DEFAULT_PORT, help = "The database port")]
    pub port: u16,

    /// Initial database
    #[arg(long, env = "SQLEXEC_DATABASE", default_value = "", help = "The database name (optional)")]
    pub database: String,

    /// Dial timeout in seconds
    #[arg(
        long = "dialTimeout",
        visible_alias = "dial-timeout",
        default_value_t = DEFAULT_DIAL_TIMEOUT_SECS,
        help = "The dial timeout in seconds (0 disables it)"
    )]
    pub dial_timeout: u64,

    /// Script file
    #[arg(long, default_value = "", help = "Path of the SQL script to execute")]
    pub filepath: String,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, help = "Only log errors")]
    pub quiet: bool,
}

impl Cli {
    /// Verbosity for the log subscriber; `--debug` implies at least DEBUG.
    pub fn log_verbosity(&self) -> u8 {
        if self.debug {
            self.verbose.max(1)
        } else {
            self.verbose
        }
    }

    /// Builds the immutable script configuration.
    pub fn to_config(&self) -> ScriptConfig {
        ScriptConfig::new(
            self.server.as_str(),
            self.user.as_str(),
            self.password.as_str(),
            self.filepath.as_str(),
        )
        .with_database(self.database.as_str())
        .with_port(self.port)
        .with_dial_timeout_secs(self.dial_timeout)
        .with_debug(self.debug)
    }
}
