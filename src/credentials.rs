//! Credential resolution.
//!
//! Turns the platform-injected credentials container (`__bx_creds`) into a
//! connection descriptor. A binding either carries a ready-made `dsn`, or the
//! discrete `connection.db2` fields from which a Db2 CLI connection string is
//! assembled.

use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol keyword appended to assembled descriptors.
const PROTOCOL: &str = "TCPIP";

/// Transport security keyword appended to assembled descriptors.
const SECURITY: &str = "SSL";

/// Keys whose values are masked when a descriptor is displayed.
const SECRET_KEYS: &[&str] = &["PWD", "PASSWORD"];

/// Credentials container as handed over by the hosting platform.
///
/// Maps a binding name to its service credentials. Only the first entry, in
/// document order, is consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsContainer(serde_json::Map<String, serde_json::Value>);

impl CredentialsContainer {
    /// Returns the first binding name with its decoded credentials.
    pub fn first_binding(&self) -> Result<(&str, ServiceCredentials)> {
        let (name, value) = self
            .0
            .iter()
            .next()
            .ok_or_else(|| ProvisionError::credentials("credentials container is empty"))?;

        let creds = ServiceCredentials::deserialize(value).map_err(|e| {
            ProvisionError::credentials(format!("malformed credentials in binding '{name}': {e}"))
        })?;

        Ok((name.as_str(), creds))
    }

    /// Resolves the connection descriptor from the first binding.
    pub fn resolve(&self) -> Result<ConnectionDescriptor> {
        let (name, creds) = self.first_binding()?;
        tracing::debug!("Resolving connection descriptor from binding '{}'", name);
        creds.to_descriptor()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for CredentialsContainer {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Credentials of a single service binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCredentials {
    /// Pre-built connection string, absent on Standard plan instances.
    #[serde(default)]
    pub dsn: Option<String>,

    /// Discrete connection details.
    #[serde(default)]
    pub connection: Option<ConnectionDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionDetails {
    #[serde(default)]
    pub db2: Option<Db2Details>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db2Details {
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub hosts: Vec<Db2Host>,

    #[serde(default)]
    pub authentication: Option<Db2Authentication>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db2Host {
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub port: Option<Port>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db2Authentication {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Port as it appears in service credentials: some plans send a number,
/// others a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u64),
    Text(String),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn required<'a, T>(value: Option<&'a T>, path: &str) -> Result<&'a T> {
    value.ok_or_else(|| ProvisionError::credentials(format!("missing field {path}")))
}

impl ServiceCredentials {
    /// Builds the connection descriptor for this binding.
    ///
    /// A non-empty `dsn` is used verbatim. Otherwise every discrete field must
    /// be present.
    pub fn to_descriptor(&self) -> Result<ConnectionDescriptor> {
        if let Some(dsn) = self.dsn.as_deref().filter(|dsn| !dsn.is_empty()) {
            return Ok(ConnectionDescriptor::new(dsn));
        }

        let db2 = required(
            self.connection.as_ref().and_then(|c| c.db2.as_ref()),
            "connection.db2",
        )?;
        let database = required(db2.database.as_ref(), "connection.db2.database")?;
        let host = required(db2.hosts.first(), "connection.db2.hosts[0]")?;
        let hostname = required(host.hostname.as_ref(), "connection.db2.hosts[0].hostname")?;
        let port = required(host.port.as_ref(), "connection.db2.hosts[0].port")?;
        let auth = required(
            db2.authentication.as_ref(),
            "connection.db2.authentication",
        )?;
        let username = required(
            auth.username.as_ref(),
            "connection.db2.authentication.username",
        )?;
        let password = required(
            auth.password.as_ref(),
            "connection.db2.authentication.password",
        )?;

        Ok(ConnectionDescriptor::new(format!(
            "DATABASE={database};HOSTNAME={hostname};PORT={port};PROTOCOL={PROTOCOL};UID={username};PWD={password};Security={SECURITY}"
        )))
    }
}

/// A resolved connection string.
///
/// `Display` and `Debug` mask password values so descriptors can be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    /// Wraps a raw connection string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw connection string, password included.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Iterates over `KEY=value` pairs. Segments without `=` are skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .split(';')
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, value)| (key.trim(), value))
    }

    /// Returns the value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Returns a display-safe rendering with secrets masked.
    pub fn redacted(&self) -> String {
        self.0
            .split(';')
            .map(|segment| match segment.split_once('=') {
                Some((key, _))
                    if SECRET_KEYS
                        .iter()
                        .any(|secret| key.trim().eq_ignore_ascii_case(secret)) =>
                {
                    format!("{key}=****")
                }
                _ => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}
