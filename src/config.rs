//! Configuration management for events-provision.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! Command-line flags are applied on top by the binary.

use crate::db::{DatabaseBackend, DEFAULT_ODBC_DRIVER};
use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable forcing the backend.
pub const ENV_BACKEND: &str = "EVENTS_BACKEND";

/// Environment variable setting the table schema.
pub const ENV_SCHEMA: &str = "EVENTS_SCHEMA";

/// Environment variable naming the ODBC driver.
pub const ENV_ODBC_DRIVER: &str = "EVENTS_ODBC_DRIVER";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Forced backend. Detected from the connection descriptor when unset.
    #[serde(default)]
    pub backend: Option<DatabaseBackend>,

    /// Schema qualifying the events table.
    #[serde(default)]
    pub schema: Option<String>,

    /// ODBC driver name used for Db2 connections.
    #[serde(default = "default_odbc_driver")]
    pub odbc_driver: String,
}

fn default_odbc_driver() -> String {
    DEFAULT_ODBC_DRIVER.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: None,
            schema: None,
            odbc_driver: default_odbc_driver(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("events-provision")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ProvisionError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ProvisionError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `EVENTS_*` environment variables over the file settings.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = lookup(ENV_BACKEND) {
            self.database.backend = Some(backend.parse()?);
        }
        if let Some(schema) = lookup(ENV_SCHEMA) {
            self.database.schema = Some(schema);
        }
        if let Some(driver) = lookup(ENV_ODBC_DRIVER) {
            self.database.odbc_driver = driver;
        }
        Ok(())
    }
}
