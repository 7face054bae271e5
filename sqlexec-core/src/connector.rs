//! SQL Server connection setup and liveness checking.
//!
//! Connecting is split into three steps:
//! - [`ConnectionDescriptor::from_config`] formats the key-value connection
//!   string
//! - [`Database::open`] parses it and builds the driver configuration
//!   without touching the network
//! - [`Database::ping`] dials, logs in and runs `SELECT 1`
//!
//! The client is held in an `Option` so [`Database::close`] releases it
//! exactly once no matter how many exit paths call it.

use crate::config::ScriptConfig;
use crate::error::{Result, SqlExecError};
use std::time::Duration;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

/// Tiberius client over a tokio TCP stream.
pub type TdsClient = Client<Compat<TcpStream>>;

const KEY_SERVER: &str = "server";
const KEY_USER: &str = "user id";
const KEY_PASSWORD: &str = "password";
const KEY_DATABASE: &str = "database";
const KEY_PORT: &str = "port";
const KEY_DIAL_TIMEOUT: &str = "dial timeout";

/// A driver connection string in `key=value;key=value` form.
///
/// ```text
/// server=<server>;user id=<user>;password=<password>;[database=<database>;]port=<port>;dial timeout=<secs>
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    text: String,
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}

impl ConnectionDescriptor {
    /// Formats the connection string for `config`.
    ///
    /// The `database=` segment is only emitted when a database is set.
    ///
    /// # Errors
    /// Returns [`SqlExecError::Descriptor`] if a value contains `;`, which
    /// would split it into extra segments. The message names the key only.
    pub fn from_config(config: &ScriptConfig) -> Result<Self> {
        let values = [
            (KEY_SERVER, config.server.as_str()),
            (KEY_USER, config.user.as_str()),
            (KEY_PASSWORD, config.password.as_str()),
            (KEY_DATABASE, config.database.as_deref().unwrap_or_default()),
        ];
        if let Some((key, _)) = values.iter().find(|(_, value)| value.contains(';')) {
            return Err(SqlExecError::descriptor(format!(
                "value for '{key}' must not contain ';'"
            )));
        }

        let database = config
            .database
            .as_ref()
            .map_or_else(String::new, |db| format!("{KEY_DATABASE}={db};"));

        Ok(Self {
            text: format!(
                "{KEY_SERVER}={};{KEY_USER}={};{KEY_PASSWORD}={};{database}{KEY_PORT}={};{KEY_DIAL_TIMEOUT}={}",
                config.server, config.user, config.password, config.port, config.dial_timeout_secs
            ),
        })
    }

    /// The full connection string, password included.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The connection string with the password value replaced by `****`.
    pub fn redacted(&self) -> String {
        self.text
            .split(';')
            .map(|segment| match segment.split_once('=') {
                Some((key, _)) if key.trim().eq_ignore_ascii_case(KEY_PASSWORD) => {
                    format!("{key}=****")
                }
                _ => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parses the descriptor into connection settings.
    ///
    /// # Errors
    /// Returns [`SqlExecError::Descriptor`] when a segment has no `=`, a key
    /// is unknown or repeated, or the port or timeout is not a number.
    pub fn parse(&self) -> Result<ConnectionSettings> {
        let mut settings = ConnectionSettings::default();
        let mut seen: Vec<String> = Vec::new();

        for segment in self.text.split(';') {
            let Some((key, value)) = segment.split_once('=') else {
                return Err(SqlExecError::descriptor(
                    "every segment must have the form key=value",
                ));
            };
            let key = key.trim().to_ascii_lowercase();
            if seen.contains(&key) {
                return Err(SqlExecError::descriptor(format!(
                    "key '{key}' appears more than once"
                )));
            }

            match key.as_str() {
                KEY_SERVER => settings.server = value.to_string(),
                KEY_USER => settings.user = value.to_string(),
                KEY_PASSWORD => settings.password = value.to_string(),
                KEY_DATABASE => {
                    settings.database = (!value.is_empty()).then(|| value.to_string());
                }
                KEY_PORT => {
                    settings.port = value.trim().parse().map_err(|_| {
                        SqlExecError::descriptor(format!("port '{value}' is not a valid port"))
                    })?;
                }
                KEY_DIAL_TIMEOUT => {
                    let secs: u64 = value.trim().parse().map_err(|_| {
                        SqlExecError::descriptor(format!(
                            "dial timeout '{value}' is not a number of seconds"
                        ))
                    })?;
                    settings.dial_timeout = Duration::from_secs(secs);
                }
                _ => {
                    return Err(SqlExecError::descriptor(format!("unknown key '{key}'")));
                }
            }
            seen.push(key);
        }

        Ok(settings)
    }
}

/// Parsed form of a [`ConnectionDescriptor`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Server address
    pub server: String,
    /// Login name
    pub user: String,
    /// Login password
    pub password: String,
    /// Optional initial database
    pub database: Option<String>,
    /// Server port
    pub port: u16,
    /// Timeout for dial plus login; zero means no timeout
    pub dial_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            user: String::new(),
            password: String::new(),
            database: None,
            port: crate::config::DEFAULT_PORT,
            dial_timeout: Duration::from_secs(crate::config::DEFAULT_DIAL_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("dial_timeout", &self.dial_timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionSettings {
    /// Builds the tiberius configuration for these settings.
    pub(crate) fn to_tiberius_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.server);
        config.port(self.port);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if let Some(database) = &self.database {
            config.database(database);
        }
        config.trust_cert();
        config
    }
}

/// An opened, possibly not yet connected, SQL Server handle.
pub struct Database {
    settings: ConnectionSettings,
    config: Config,
    client: Option<TdsClient>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("settings", &self.settings)
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl Database {
    /// Validates the descriptor and prepares the driver configuration.
    ///
    /// No network traffic happens here; an unreachable server is only
    /// detected by [`Database::ping`].
    ///
    /// # Errors
    /// Returns [`SqlExecError::Descriptor`] if the descriptor is malformed.
    pub fn open(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let settings = descriptor.parse()?;
        debug!("Opening {}", descriptor.redacted());
        let config = settings.to_tiberius_config();

        Ok(Self {
            settings,
            config,
            client: None,
        })
    }

    /// Whether a live client is currently held.
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Connects if needed and runs a `SELECT 1` round trip.
    ///
    /// # Errors
    /// Returns a connection or timeout error if the server cannot be
    /// reached, rejects the login, or fails the probe query.
    pub async fn ping(&mut self) -> Result<()> {
        let client = self.connected_client().await?;

        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| SqlExecError::connection_failed("liveness probe", e))?
            .into_results()
            .await
            .map_err(|e| SqlExecError::connection_failed("liveness probe", e))?;

        info!(
            "Connected to {}:{}",
            self.settings.server, self.settings.port
        );
        Ok(())
    }

    /// Mutable access to the live client.
    ///
    /// # Errors
    /// Returns a configuration error if [`Database::ping`] has not
    /// established a connection.
    pub fn client_mut(&mut self) -> Result<&mut TdsClient> {
        self.client
            .as_mut()
            .ok_or_else(|| SqlExecError::configuration("database is not connected"))
    }

    /// Closes the connection. Later calls do nothing.
    ///
    /// # Errors
    /// Returns a connection error if the driver reports a failure while
    /// shutting the stream down. The client is released either way.
    pub async fn close(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        debug!("Closing connection");
        client
            .close()
            .await
            .map_err(|e| SqlExecError::connection_failed("close", e))
    }

    async fn connected_client(&mut self) -> Result<&mut TdsClient> {
        if self.client.is_none() {
            let client = dial(&self.config, self.settings.dial_timeout).await?;
            self.client = Some(client);
        }
        self.client_mut()
    }
}

/// Dials the server and performs the TDS login, bounded by `timeout`.
async fn dial(config: &Config, timeout: Duration) -> Result<TdsClient> {
    let connect = async {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| SqlExecError::connection_failed("TCP connect", e))?;
        tcp.set_nodelay(true)
            .map_err(|e| SqlExecError::connection_failed("TCP setup", e))?;

        let client = Client::connect(config.clone(), tcp.compat_write())
            .await
            .map_err(|e| SqlExecError::connection_failed("login", e))?;
        Ok::<TdsClient, SqlExecError>(client)
    };

    if timeout.is_zero() {
        return connect.await;
    }

    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| SqlExecError::DialTimeout { timeout })?
}
