//! Mock database for testing.
//!
//! Provides an in-memory catalog that understands just enough of the
//! provisioning statements to behave like a real database: creating an
//! existing table fails, inserting into or dropping a missing table fails.

use super::{Connector, DatabaseBackend, DatabaseClient, ExecOutcome};
use crate::credentials::ConnectionDescriptor;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shared state of the mock database, surviving across connections.
#[derive(Debug, Default)]
pub struct MockCatalog {
    tables: HashMap<String, usize>,
    executed: Vec<String>,
    opened: usize,
    closed: usize,
}

impl MockCatalog {
    /// Row count of a table, or None if it does not exist.
    pub fn table_rows(&self, name: &str) -> Option<usize> {
        self.tables.get(&name.to_lowercase()).copied()
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Number of connections opened.
    pub fn opened(&self) -> usize {
        self.opened
    }

    /// Number of connections closed.
    pub fn closed(&self) -> usize {
        self.closed
    }

    fn apply(&mut self, sql: &str) -> Result<ExecOutcome> {
        self.executed.push(sql.to_string());
        let normalized = sql.trim().to_lowercase();

        if let Some(rest) = normalized.strip_prefix("create table ") {
            let name = object_name(rest);
            if self.tables.contains_key(&name) {
                return Err(mock_error(
                    format!("object '{name}' already exists"),
                    "42710",
                ));
            }
            self.tables.insert(name, 0);
            Ok(ExecOutcome::new(None))
        } else if let Some(rest) = normalized.strip_prefix("insert into ") {
            let name = object_name(rest);
            let rows = normalized.matches("),(").count() + 1;
            let count = self
                .tables
                .get_mut(&name)
                .ok_or_else(|| mock_error(format!("'{name}' is an undefined name"), "42704"))?;
            *count += rows;
            Ok(ExecOutcome::new(Some(rows as u64)))
        } else if let Some(rest) = normalized.strip_prefix("drop table ") {
            let name = object_name(rest);
            self.tables
                .remove(&name)
                .ok_or_else(|| mock_error(format!("'{name}' is an undefined name"), "42704"))?;
            Ok(ExecOutcome::new(None))
        } else {
            Err(mock_error("statement not supported by the mock", "42601"))
        }
    }
}

fn object_name(rest: &str) -> String {
    rest.split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn mock_error(message: impl Into<String>, sqlstate: &str) -> ProvisionError {
    ProvisionError::Statement {
        message: message.into(),
        sqlstate: Some(sqlstate.to_string()),
    }
}

fn lock(catalog: &Mutex<MockCatalog>) -> Result<MutexGuard<'_, MockCatalog>> {
    catalog
        .lock()
        .map_err(|_| ProvisionError::internal("mock catalog lock poisoned"))
}

/// A mock client bound to a shared catalog.
#[derive(Default)]
pub struct MockDatabaseClient {
    catalog: Arc<Mutex<MockCatalog>>,
    fail_statements: bool,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    /// Creates a client on an existing catalog.
    pub fn with_catalog(catalog: Arc<Mutex<MockCatalog>>) -> Self {
        Self {
            catalog,
            fail_statements: false,
            closed: AtomicBool::new(false),
        }
    }

    /// Makes every statement fail without touching the catalog.
    pub fn failing(mut self) -> Self {
        self.fail_statements = true;
        self
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&self, sql: &str) -> Result<ExecOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProvisionError::connection("Connection is already closed"));
        }
        if self.fail_statements {
            return Err(mock_error("simulated statement failure", "58004"));
        }
        lock(&self.catalog)?
            .apply(sql)
            .map(|outcome| outcome.with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            lock(&self.catalog)?.closed += 1;
        }
        Ok(())
    }
}

/// Connector handing out mock clients that share one catalog.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    catalog: Arc<Mutex<MockCatalog>>,
    fail_connect: bool,
    fail_statements: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every connect attempt fail.
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Makes every statement fail.
    pub fn failing_statements(mut self) -> Self {
        self.fail_statements = true;
        self
    }

    /// Snapshot access to the shared catalog.
    pub fn catalog(&self) -> MutexGuard<'_, MockCatalog> {
        match self.catalog.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _backend: DatabaseBackend,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn DatabaseClient>> {
        if self.fail_connect {
            return Err(ProvisionError::Connection {
                message: format!("simulated connection failure for {descriptor}"),
                sqlstate: Some("08001".to_string()),
            });
        }

        lock(&self.catalog)?.opened += 1;
        let client = MockDatabaseClient::with_catalog(Arc::clone(&self.catalog));
        let client = if self.fail_statements {
            client.failing()
        } else {
            client
        };
        Ok(Box::new(client))
    }
}
