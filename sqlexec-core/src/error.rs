//! Error types for connection setup and script execution.
//!
//! Messages never include the password. The one place credentials reach the
//! terminal is the explicit `--debug` echo in the binary.

use std::time::Duration;
use thiserror::Error;

/// Boxed driver or I/O error carried as a source.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for sqlexec operations.
#[derive(Debug, Error)]
pub enum SqlExecError {
    /// The server could not be reached or rejected the login
    #[error("Database connection failed: {context}: {source}")]
    Connection {
        context: String,
        #[source]
        source: BoxedError,
    },

    /// Dialing the server did not finish within the configured timeout
    #[error("Database connection timed out after {timeout:?}")]
    DialTimeout { timeout: Duration },

    /// The connection descriptor is not valid `key=value;...` syntax
    #[error("Invalid connection descriptor: {message}")]
    Descriptor { message: String },

    /// Configuration or usage error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Query submission or result iteration failed
    #[error("Query execution failed during {stage}: {source}")]
    QueryExecution {
        stage: &'static str,
        #[source]
        source: BoxedError,
    },

    /// A single cell could not be converted into a column value
    #[error("Failed to decode column {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: BoxedError,
    },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results with `SqlExecError`
pub type Result<T> = std::result::Result<T, SqlExecError>;

impl SqlExecError {
    /// Creates a connection error with context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a descriptor syntax error
    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor {
            message: message.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a query execution error tagged with the stage that failed
    pub fn query_failed<E>(stage: &'static str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::QueryExecution {
            stage,
            source: Box::new(error),
        }
    }

    /// Creates a decode error for the cell at `index`
    pub fn decode<E>(index: usize, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode {
            index,
            source: Box::new(error),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
