//! Coordinator configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Settings shared by every coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalConfig {
    /// Upper bound on one unit of work, from BEGIN to COMMIT.
    pub unit_of_work_timeout: Duration,

    /// How many times `rent` re-selects a copy after losing a reserve race.
    pub reserve_attempts: u32,
}

impl Default for RentalConfig {
    fn default() -> Self {
        RentalConfig {
            unit_of_work_timeout: Duration::from_secs(10),
            reserve_attempts: 3,
        }
    }
}

impl RentalConfig {
    /// Load coordinator settings from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = RentalConfig::default();

        let timeout_secs: u64 = parse_var(
            "CINERENT_UNIT_OF_WORK_TIMEOUT_SECS",
            defaults.unit_of_work_timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "CINERENT_UNIT_OF_WORK_TIMEOUT_SECS".to_string(),
            ));
        }

        let reserve_attempts: u32 =
            parse_var("CINERENT_RESERVE_ATTEMPTS", defaults.reserve_attempts)?;
        if reserve_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "CINERENT_RESERVE_ATTEMPTS".to_string(),
            ));
        }

        Ok(RentalConfig {
            unit_of_work_timeout: Duration::from_secs(timeout_secs),
            reserve_attempts,
        })
    }

    pub fn unit_of_work_timeout(mut self, timeout: Duration) -> Self {
        self.unit_of_work_timeout = timeout;
        self
    }

    pub fn reserve_attempts(mut self, attempts: u32) -> Self {
        self.reserve_attempts = attempts.max(1);
        self
    }
}

impl DbConfig {
    /// Load database settings from environment variables.
    ///
    /// `CINERENT_DATABASE_PATH` defaults to `./cinerent.db`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CINERENT_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./cinerent.db"));

        let config = DbConfig::new(path);
        let max_connections: u32 =
            parse_var("CINERENT_MAX_CONNECTIONS", config.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "CINERENT_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(config.max_connections(max_connections))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
