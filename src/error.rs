//! Error types for events-provision.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for provisioning operations.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Credentials container is empty or a binding lacks a required field.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Mode selector is not one of setup, sampledata or cleanup.
    #[error("Unknown mode '{0}'. Expected: setup, sampledata, or cleanup")]
    UnknownMode(String),

    /// Opening the connection failed (bad descriptor, network, auth, missing driver).
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        sqlstate: Option<String>,
    },

    /// The SQL statement failed (table exists, table missing, constraint violation).
    #[error("Statement error: {message}")]
    Statement {
        message: String,
        sqlstate: Option<String>,
    },

    /// Configuration errors (invalid config file, unknown backend, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (worker thread panics, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProvisionError {
    /// Creates a credentials error with the given message.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Creates a connection error without a SQLSTATE.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            sqlstate: None,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "Credentials Error",
            Self::UnknownMode(_) => "Mode Error",
            Self::Connection { .. } => "Connection Error",
            Self::Statement { .. } => "Statement Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Short machine-readable kind used in the `dberror` payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "credentials",
            Self::UnknownMode(_) => "mode",
            Self::Connection { .. } => "connection",
            Self::Statement { .. } => "statement",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// SQLSTATE reported by the driver, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Connection { sqlstate, .. } | Self::Statement { sqlstate, .. } => {
                sqlstate.as_deref()
            }
            _ => None,
        }
    }
}

/// Result type alias using ProvisionError.
pub type Result<T> = std::result::Result<T, ProvisionError>;
