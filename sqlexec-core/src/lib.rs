//! Core library for sqlexec.
//!
//! sqlexec runs a SQL script file against Microsoft SQL Server and prints
//! every result set as tab-separated text. This crate holds everything
//! except argument parsing:
//!
//! - [`config`]: the immutable [`ScriptConfig`]
//! - [`connector`]: connection string, lazy open, liveness probe, close
//! - [`runner`]: script loading and result rendering
//! - [`value`]: the closed [`ColumnValue`] type and its text form
//!
//! # Security
//! The password is only ever printed by the explicit `--debug` echo. Log
//! lines and error messages use the redacted connection string.

pub mod config;
pub mod connector;
pub mod error;
pub mod logging;
pub mod runner;
pub mod value;

// Re-export commonly used types
pub use config::ScriptConfig;
pub use connector::{ConnectionDescriptor, ConnectionSettings, Database};
pub use error::{Result, SqlExecError};
pub use logging::init_logging;
pub use runner::{ResultEvent, ResultSource, RunSummary, ScriptRunner, load_script};
pub use value::ColumnValue;
