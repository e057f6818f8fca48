//! Db2 database client implementation.
//!
//! Talks to Db2 through the IBM CLI/ODBC driver using odbc-api. ODBC
//! connections are blocking and not `Send`, so each client owns a worker
//! thread that holds the connection and serves commands over a channel.

use crate::credentials::ConnectionDescriptor;
use crate::db::{DatabaseClient, ExecOutcome};
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use odbc_api::{Connection, ConnectionOptions, Environment};
use std::sync::{mpsc, Mutex, OnceLock};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// Process-wide ODBC environment. Connections borrow from it.
static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

fn odbc_environment() -> Result<&'static Environment> {
    if let Some(env) = ODBC_ENV.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| {
        ProvisionError::connection(format!("Cannot initialize ODBC environment: {e}"))
    })?;
    Ok(ODBC_ENV.get_or_init(|| env))
}

/// Commands served by the connection worker.
enum Command {
    Execute {
        sql: String,
        reply: oneshot::Sender<Result<ExecOutcome>>,
    },
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Db2 database client holding one ODBC connection.
pub struct Db2Client {
    commands: Mutex<Option<mpsc::Sender<Command>>>,
}

impl Db2Client {
    /// Opens a connection for the descriptor.
    ///
    /// A `DRIVER` keyword naming `odbc_driver` is prepended unless the
    /// descriptor already names one.
    pub async fn connect(descriptor: &ConnectionDescriptor, odbc_driver: &str) -> Result<Self> {
        let conn_str = odbc_connection_string(descriptor, odbc_driver);
        let descriptor = descriptor.clone();
        let odbc_driver = odbc_driver.to_string();

        let (commands, inbox) = mpsc::channel();
        let (ready, connected) = oneshot::channel();

        std::thread::Builder::new()
            .name("db2-connection".to_string())
            .spawn(move || {
                let opened = odbc_environment().and_then(|env| {
                    env.connect_with_connection_string(&conn_str, ConnectionOptions::default())
                        .map_err(|e| map_connection_error(e, &descriptor, &odbc_driver))
                });
                match opened {
                    Ok(conn) => {
                        if ready.send(Ok(())).is_ok() {
                            serve(conn, inbox);
                        }
                    }
                    Err(e) => {
                        let _ = ready.send(Err(e));
                    }
                }
            })
            .map_err(|e| ProvisionError::internal(format!("Cannot start ODBC worker: {e}")))?;

        connected
            .await
            .map_err(|_| ProvisionError::internal("ODBC worker exited while connecting"))??;

        debug!("Connected to Db2");
        Ok(Self {
            commands: Mutex::new(Some(commands)),
        })
    }

    fn sender(&self) -> Result<mpsc::Sender<Command>> {
        self.commands
            .lock()
            .map_err(|_| ProvisionError::internal("ODBC command lock poisoned"))?
            .clone()
            .ok_or_else(|| ProvisionError::connection("Connection is already closed"))
    }
}

/// Worker loop. Returns once closed or once the client is dropped.
fn serve(conn: Connection<'static>, inbox: mpsc::Receiver<Command>) {
    while let Ok(command) = inbox.recv() {
        match command {
            Command::Execute { sql, reply } => {
                let _ = reply.send(execute_blocking(&conn, &sql));
            }
            Command::Close { reply } => {
                // Dropping the connection disconnects it.
                drop(conn);
                let _ = reply.send(Ok(()));
                return;
            }
        }
    }
}

fn execute_blocking(conn: &Connection<'_>, sql: &str) -> Result<ExecOutcome> {
    let start = Instant::now();
    let mut prepared = conn.prepare(sql).map_err(map_statement_error)?;
    // Discards the optional result-set cursor, not the outcome. DDL and INSERT
    // never open one, and errors still propagate through `?`.
    let _ = prepared.execute(()).map_err(map_statement_error)?;
    let rows_affected = prepared.row_count().map_err(map_statement_error)?;

    Ok(ExecOutcome::new(rows_affected.map(|n| n as u64)).with_execution_time(start.elapsed()))
}

#[async_trait]
impl DatabaseClient for Db2Client {
    async fn execute(&self, sql: &str) -> Result<ExecOutcome> {
        let (reply, response) = oneshot::channel();
        self.sender()?
            .send(Command::Execute {
                sql: sql.to_string(),
                reply,
            })
            .map_err(|_| ProvisionError::connection("Db2 connection worker has stopped"))?;

        response
            .await
            .map_err(|_| ProvisionError::internal("Db2 connection worker dropped the request"))?
    }

    async fn close(&self) -> Result<()> {
        let sender = self
            .commands
            .lock()
            .map_err(|_| ProvisionError::internal("ODBC command lock poisoned"))?
            .take();
        let Some(sender) = sender else {
            return Ok(());
        };

        let (reply, response) = oneshot::channel();
        if sender.send(Command::Close { reply }).is_err() {
            // Worker already gone, and the connection with it.
            return Ok(());
        }
        response
            .await
            .map_err(|_| ProvisionError::internal("Db2 connection worker failed to disconnect"))?
    }
}

/// Builds the string handed to the ODBC driver manager.
fn odbc_connection_string(descriptor: &ConnectionDescriptor, odbc_driver: &str) -> String {
    if descriptor.get("DRIVER").is_some() {
        descriptor.expose().to_string()
    } else {
        format!("DRIVER={{{odbc_driver}}};{}", descriptor.expose())
    }
}

fn sqlstate(error: &odbc_api::Error) -> Option<String> {
    match error {
        odbc_api::Error::Diagnostics { record, .. } => Some(record.state.as_str().to_string()),
        _ => None,
    }
}

/// Maps an ODBC connect failure to a connection error with a friendlier hint.
fn map_connection_error(
    error: odbc_api::Error,
    descriptor: &ConnectionDescriptor,
    odbc_driver: &str,
) -> ProvisionError {
    let host = descriptor.get("HOSTNAME").unwrap_or("unknown");
    let port = descriptor.get("PORT").unwrap_or("unknown");
    let user = descriptor.get("UID").unwrap_or("unknown");
    let state = sqlstate(&error);
    let error_str = error.to_string();

    let message = if state.as_deref() == Some("IM002") {
        format!("ODBC driver '{odbc_driver}' is not installed or not registered.")
    } else if error_str.contains("SQL30081N") {
        format!("Cannot connect to {host}:{port}. Check that the server is reachable.")
    } else if error_str.contains("SQL30082N") {
        format!("Authentication failed for user '{user}'. Check your credentials.")
    } else {
        error_str
    };

    ProvisionError::Connection {
        message,
        sqlstate: state,
    }
}

fn map_statement_error(error: odbc_api::Error) -> ProvisionError {
    ProvisionError::Statement {
        sqlstate: sqlstate(&error),
        message: error.to_string(),
    }
}
