//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// TCP port to listen on. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface address to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Upper bound on waiting for and running a single tool call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long `stop` waits for in-flight requests before aborting them.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Sessions without traffic for this long are discarded.
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,
}

impl ServerConfig {
    /// Validates the server section.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is unparsable or a timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!("Invalid bind address '{}'", self.bind_address),
            });
        }
        for (name, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("shutdown_timeout_ms", self.shutdown_timeout_ms),
            ("session_idle_timeout_secs", self.session_idle_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }
        Ok(())
    }

    /// Returns the socket address to bind, if the bind address parses.
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_address
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }

    /// Per-request tool timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Idle time after which a session is discarded.
    #[must_use]
    pub const fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            request_timeout_ms: default_request_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
        }
    }
}

const fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

const fn default_session_idle_timeout_secs() -> u64 {
    3_600
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
