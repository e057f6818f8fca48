//! SQLite database client implementation.
//!
//! Used for local runs and tests. Holds a single sqlx connection, not a pool.

use crate::credentials::ConnectionDescriptor;
use crate::db::{DatabaseClient, ExecOutcome};
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Mutex<Option<SqliteConnection>>,
}

impl SqliteClient {
    /// Opens the database file named by a `sqlite:` URL, creating it if needed.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(descriptor.expose())
            .map_err(|e| ProvisionError::connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        let conn = options.connect().await.map_err(|e| ProvisionError::Connection {
            sqlstate: database_code(&e),
            message: e.to_string(),
        })?;

        debug!("Connected to SQLite database {}", descriptor);
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute(&self, sql: &str) -> Result<ExecOutcome> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| ProvisionError::connection("Connection is already closed"))?;

        let start = Instant::now();
        // A plain &str runs unprepared, statement by statement. The setup
        // string holds two of them, so they share one transaction.
        let mut tx = conn.begin().await.map_err(statement_error)?;
        let result = sqlx::Executor::execute(&mut *tx, sql)
            .await
            .map_err(statement_error)?;
        tx.commit().await.map_err(statement_error)?;

        Ok(ExecOutcome::new(Some(result.rows_affected())).with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.close()
                .await
                .map_err(|e| ProvisionError::connection(format!("Failed to close: {e}")))?;
        }
        Ok(())
    }
}

fn statement_error(error: sqlx::Error) -> ProvisionError {
    ProvisionError::Statement {
        sqlstate: database_code(&error),
        message: error.to_string(),
    }
}

fn database_code(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}
