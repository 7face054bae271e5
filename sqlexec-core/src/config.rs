//! Script execution configuration.
//!
//! `ScriptConfig` is built once from the command line and then passed by
//! reference to the connector and the runner. It is never mutated after
//! construction.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Default dial timeout in seconds.
pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 5;

/// Connection and execution parameters for one invocation.
///
/// No validation happens here. Empty values are passed through and surface
/// later as connection or file-read failures.
///
/// # Example
/// ```rust
/// use sqlexec_core::ScriptConfig;
///
/// let config = ScriptConfig::new("db.internal", "sa", "secret", "migrate.sql")
///     .with_database("inventory")
///     .with_port(14330);
///
/// assert_eq!(config.port, 14330);
/// assert_eq!(config.database.as_deref(), Some("inventory"));
/// assert_eq!(config.dial_timeout_secs, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Database server address
    pub server: String,
    /// Login name
    pub user: String,
    /// Login password, kept in plain text for the driver
    pub password: String,
    /// Optional initial database
    pub database: Option<String>,
    /// Server port
    pub port: u16,
    /// Dial timeout in whole seconds; 0 disables the timeout
    pub dial_timeout_secs: u64,
    /// Path of the SQL script to execute
    pub filepath: PathBuf,
    /// Echo parameters and diagnostics to stdout
    pub debug: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            password: String::new(),
            database: None,
            port: DEFAULT_PORT,
            dial_timeout_secs: DEFAULT_DIAL_TIMEOUT_SECS,
            filepath: PathBuf::new(),
            debug: false,
        }
    }
}

impl std::fmt::Display for ScriptConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ScriptConfig({}:{}{})",
            self.server,
            self.port,
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{db}"))
        )
        // Intentionally omit user and password
    }
}

impl ScriptConfig {
    /// Creates a config with default port, dial timeout and no database.
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        filepath: impl Into<PathBuf>,
    ) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            password: password.into(),
            filepath: filepath.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the database. An empty name means none.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.database = (!database.is_empty()).then_some(database);
        self
    }

    /// Builder method to set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the dial timeout in seconds.
    #[must_use]
    pub const fn with_dial_timeout_secs(mut self, secs: u64) -> Self {
        self.dial_timeout_secs = secs;
        self
    }

    /// Builder method to enable debug echoes.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The dial timeout as a `Duration`.
    pub const fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    /// Writes every parsed value to `out`, one ` name:value` line each.
    ///
    /// The password is written in plain text. This is the documented
    /// behavior of `--debug` and callers must only invoke it in that mode.
    ///
    /// # Errors
    /// Returns any error from the underlying writer.
    pub fn write_debug_echo<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, " password:{}", self.password)?;
        writeln!(out, " port:{}", self.port)?;
        writeln!(out, " server:{}", self.server)?;
        writeln!(out, " user:{}", self.user)?;
        writeln!(out, " database:{}", self.database.as_deref().unwrap_or(""))?;
        writeln!(out, " dialTimeout:{}", self.dial_timeout_secs)?;
        writeln!(out, " filepath:{}", self.filepath.display())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_script_config_default() {
        let config = ScriptConfig::default();
        assert_eq!(config.port, 1433);
        assert_eq!(config.dial_timeout_secs, 5);
        assert_eq!(config.dial_timeout(), Duration::from_secs(5));
        assert!(config.database.is_none());
        assert!(!config.debug);
        assert!(config.server.is_empty());
    }

    #[test]
    fn test_empty_database_means_none() {
        let config = ScriptConfig::new("localhost", "sa", "pw", "a.sql").with_database("");
        assert!(config.database.is_none());

        let config = config.with_database("master");
        assert_eq!(config.database.as_deref(), Some("master"));
    }

    #[test]
    fn test_display_has_no_credentials() {
        let config = ScriptConfig::new("db.example.com", "report_user", "hunter2", "q.sql")
            .with_database("sales");

        let display = config.to_string();
        assert!(display.contains("db.example.com:1433/sales"));
        assert!(!display.contains("report_user"));
        assert!(!display.contains("hunter2"));
    }

    #[test]
    fn test_debug_echo_lists_every_value() {
        let config = ScriptConfig::new("db1", "sa", "hunter2", "/tmp/x.sql")
            .with_database("master")
            .with_port(1500)
            .with_dial_timeout_secs(9)
            .with_debug(true);

        let mut out = Vec::new();
        config.write_debug_echo(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            " password:hunter2\n port:1500\n server:db1\n user:sa\n database:master\n dialTimeout:9\n filepath:/tmp/x.sql\n"
        );
    }
}
