//! Statement dispatch.
//!
//! Opens one connection, runs the statement for the requested mode and closes
//! the connection again, whether the statement succeeded or not.

use crate::credentials::ConnectionDescriptor;
use crate::db::{Connector, DatabaseBackend};
use crate::error::Result;
use crate::mode::Mode;
use crate::statements::EventsTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementResult {
    pub mode: Mode,
    pub backend: DatabaseBackend,
    pub statement: String,
    pub rows_affected: Option<u64>,
    #[serde(rename = "execution_time_ms", with = "crate::db::duration_millis")]
    pub execution_time: Duration,
}

/// Runs provisioning statements through a connector.
pub struct Dispatcher {
    connector: Box<dyn Connector>,
    table: EventsTable,
    backend: Option<DatabaseBackend>,
}

impl Dispatcher {
    /// Creates a dispatcher that detects the backend from each descriptor.
    pub fn new(connector: impl Connector + 'static, table: EventsTable) -> Self {
        Self {
            connector: Box::new(connector),
            table,
            backend: None,
        }
    }

    /// Forces a backend instead of detecting it.
    pub fn with_backend(mut self, backend: Option<DatabaseBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Returns the backend used for `descriptor`.
    pub fn backend_for(&self, descriptor: &ConnectionDescriptor) -> DatabaseBackend {
        self.backend
            .unwrap_or_else(|| DatabaseBackend::detect(descriptor))
    }

    /// Executes the statement for `mode`.
    ///
    /// The connection is closed on every path once it is open. A failed close
    /// after a successful statement is logged and does not fail the call.
    pub async fn run(&self, descriptor: &ConnectionDescriptor, mode: Mode) -> Result<StatementResult> {
        let backend = self.backend_for(descriptor);
        let statement = self.table.statement(mode, backend);

        info!(
            "Running '{}' on {} table {} via {}",
            mode,
            backend,
            self.table.qualified_name(),
            descriptor
        );

        let client = self.connector.connect(backend, descriptor).await?;
        let executed = client.execute(&statement).await;

        if let Err(e) = client.close().await {
            warn!("Failed to close connection: {}", e);
        }

        let outcome = executed?;
        // Drivers disagree on what DDL reports; only inserts carry a count.
        let rows_affected = outcome.rows_affected.filter(|_| !mode.is_ddl());
        info!(
            "'{}' finished in {:?} (rows affected: {:?})",
            mode, outcome.execution_time, rows_affected
        );

        Ok(StatementResult {
            mode,
            backend,
            statement,
            rows_affected,
            execution_time: outcome.execution_time,
        })
    }
}
