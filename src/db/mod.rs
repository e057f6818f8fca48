//! Database abstraction layer.
//!
//! Provides a trait-based interface for the few operations provisioning needs,
//! so Db2, SQLite and the in-memory mock can be used interchangeably.

mod db2;
mod mock;
mod sqlite;
mod types;

pub use db2::Db2Client;
pub use mock::{MockCatalog, MockConnector, MockDatabaseClient};
pub use sqlite::SqliteClient;
pub use types::ExecOutcome;
pub(crate) use types::duration_millis;

use crate::credentials::ConnectionDescriptor;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// ODBC driver name registered by the IBM Db2 CLI/ODBC driver package.
pub const DEFAULT_ODBC_DRIVER: &str = "IBM DB2 ODBC DRIVER";

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Db2,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Db2 => "db2",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "db2" => Some(Self::Db2),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Picks the backend a descriptor is meant for.
    ///
    /// SQLite URLs start with `sqlite:`; everything else is treated as a Db2
    /// CLI connection string.
    pub fn detect(descriptor: &ConnectionDescriptor) -> Self {
        if descriptor.expose().trim_start().starts_with("sqlite:") {
            Self::Sqlite
        } else {
            Self::Db2
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseBackend {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            ProvisionError::config(format!(
                "Unknown backend '{s}'. Expected 'db2' or 'sqlite'"
            ))
        })
    }
}

/// Trait defining the interface for database clients.
///
/// A client wraps exactly one open connection.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a statement that returns no result set.
    async fn execute(&self, sql: &str) -> Result<ExecOutcome>;

    /// Closes the connection. Calling it again is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Opens database clients. One call, one fresh connection.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        backend: DatabaseBackend,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn DatabaseClient>>;
}

/// Connector backed by the real drivers.
#[derive(Debug, Clone)]
pub struct DriverConnector {
    odbc_driver: String,
}

impl DriverConnector {
    pub fn new(odbc_driver: impl Into<String>) -> Self {
        Self {
            odbc_driver: odbc_driver.into(),
        }
    }
}

impl Default for DriverConnector {
    fn default() -> Self {
        Self::new(DEFAULT_ODBC_DRIVER)
    }
}

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(
        &self,
        backend: DatabaseBackend,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn DatabaseClient>> {
        match backend {
            DatabaseBackend::Db2 => {
                let client = Db2Client::connect(descriptor, &self.odbc_driver).await?;
                Ok(Box::new(client))
            }
            DatabaseBackend::Sqlite => {
                let client = SqliteClient::connect(descriptor).await?;
                Ok(Box::new(client))
            }
        }
    }
}
