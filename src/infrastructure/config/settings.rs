//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; the external token secret comes
//! only from the `KASTIA_EXTERNAL_JWT_SECRET` environment variable.
//!
//! # Example
//!
//! ```no_run
//! use kastia::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::adapter::outbound::identity::jwt::DEFAULT_AUDIENCE;
use crate::application::account::DEFAULT_TOKEN_LENGTH;
use crate::error::{ConfigError, Result};

/// Environment variable holding the shared secret for external tokens.
pub const EXTERNAL_SECRET_ENV: &str = "KASTIA_EXTERNAL_JWT_SECRET";

const MIN_TOKEN_LENGTH: usize = 20;
const MAX_TOKEN_LENGTH: usize = 128;

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8000`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
        }
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "kastia.db".into(),
            max_connections: 8,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Length of issued opaque tokens.
    pub token_length: usize,
    /// Required `aud` claim of external tokens.
    pub external_audience: String,
    /// Loaded from the environment, never from the file.
    #[serde(skip)]
    pub external_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_length: DEFAULT_TOKEN_LENGTH,
            external_audience: DEFAULT_AUDIENCE.into(),
            external_secret: None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse and validate TOML, reading secrets from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for malformed or invalid settings.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.auth.external_secret = std::env::var(EXTERNAL_SECRET_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file from disk.
    ///
    /// # Errors
    /// Returns [`ConfigError::ReadFile`] when the file cannot be read, or any
    /// error from [`Config::parse_toml`].
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    /// Same as [`Config::load`] for files that exist.
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.path",
            }
            .into());
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.auth.token_length) {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_length",
                reason: format!("must be between {MIN_TOKEN_LENGTH} and {MAX_TOKEN_LENGTH}"),
            }
            .into());
        }
        if self.auth.external_audience.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "auth.external_audience",
            }
            .into());
        }
        Ok(())
    }

    /// Parsed listener address.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for an unparseable address.
    #[allow(clippy::result_large_err)]
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidValue {
                field: "server.bind",
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::infrastructure::config::logging::LogFormat;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.database.path, "kastia.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.auth.token_length, DEFAULT_TOKEN_LENGTH);
        assert_eq!(config.auth.external_audience, "authenticated");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [database]
            path = "/var/lib/kastia/app.db"
            max_connections = 2

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_pool_size() {
        let err = Config::parse_toml("[database]\nmax_connections = 0").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "database.max_connections",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_bind_address() {
        let err = Config::parse_toml("[server]\nbind = \"nowhere\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "server.bind",
                ..
            })
        ));
    }

    #[test]
    fn rejects_short_tokens() {
        assert!(Config::parse_toml("[auth]\ntoken_length = 4").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::parse_toml("[server").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
