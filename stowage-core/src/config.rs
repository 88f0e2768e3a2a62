//! Environment-backed configuration.
//!
//! The layer is configured through three required variables: `DB_HOST`,
//! `DB_PORT`, and `DATABASE_NAME`. Validation reports every missing
//! variable at once rather than failing on the first.

use std::env;

use thiserror::Error;
use tracing::error;

/// Environment variable naming the database host
pub const ENV_HOST: &str = "DB_HOST";
/// Environment variable naming the database port
pub const ENV_PORT: &str = "DB_PORT";
/// Environment variable naming the target database
pub const ENV_DATABASE: &str = "DATABASE_NAME";

/// Immutable connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub db_name: String,
}

/// Configuration validation error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("missing required environment variables: {}", .variables.join(", "))]
    Missing { variables: Vec<&'static str> },

    /// DB_PORT is set but does not parse as a TCP port
    #[error("DB_PORT is not a valid port number: '{value}'")]
    InvalidPort { value: String },
}

impl DbConfig {
    /// Build a configuration directly, bypassing the environment.
    pub fn new(host: impl Into<String>, port: u16, db_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            db_name: db_name.into(),
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through an injectable variable lookup.
    ///
    /// Empty values count as missing. Every absent variable is reported
    /// in a single [`ConfigError::Missing`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |name: &'static str| {
            let value = lookup(name).filter(|value| !value.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value
        };

        let host = require(ENV_HOST);
        let port = require(ENV_PORT);
        let db_name = require(ENV_DATABASE);

        let (Some(host), Some(port), Some(db_name)) = (host, port, db_name) else {
            return Err(ConfigError::Missing { variables: missing });
        };

        let port = port
            .parse()
            .map_err(|_| ConfigError::InvalidPort { value: port })?;

        Ok(Self {
            host,
            port,
            db_name,
        })
    }

    /// Load `.env`, read the environment, and exit when invalid.
    ///
    /// Intended for binary entry points: validation failures are logged
    /// and the process terminates with a non-zero status. Library code
    /// should prefer [`DbConfig::from_env`] and handle the error.
    pub fn load_or_exit() -> Self {
        dotenvy::dotenv().ok();

        match Self::from_env() {
            Ok(config) => config,
            Err(err) => {
                error!(error = %err, "invalid database configuration");
                std::process::exit(1);
            }
        }
    }
}
