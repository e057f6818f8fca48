//! Invocation entry point.
//!
//! Accepts the parameters object the hosting platform passes in and always
//! answers with an envelope: `{ "result": ... }` or `{ "dberror": ... }`.

use crate::credentials::CredentialsContainer;
use crate::dispatch::{Dispatcher, StatementResult};
use crate::error::{ProvisionError, Result};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

/// Parameters of one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationParams {
    /// Platform-injected service credentials.
    #[serde(rename = "__bx_creds", default)]
    pub credentials: CredentialsContainer,

    /// Requested mode, validated when the invocation runs.
    ///
    /// Kept as raw JSON: a null or non-string mode is an unknown mode, not a
    /// malformed parameters object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Value>,
}

impl InvocationParams {
    /// Parses the parameters object from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ProvisionError::config(format!("Invalid invocation parameters: {e}")))
    }

    /// Replaces the requested mode.
    pub fn set_mode(&mut self, mode: impl Into<String>) {
        self.mode = Some(Value::String(mode.into()));
    }

    /// Parses the requested mode.
    pub fn mode(&self) -> Result<Mode> {
        match &self.mode {
            Some(Value::String(mode)) => mode.parse(),
            Some(other) => Err(ProvisionError::UnknownMode(other.to_string())),
            None => Err(ProvisionError::UnknownMode(String::new())),
        }
    }
}

/// Error details returned in a `dberror` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlstate: Option<String>,
}

impl From<&ProvisionError> for ErrorPayload {
    fn from(err: &ProvisionError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            sqlstate: err.sqlstate().map(String::from),
        }
    }
}

/// The two-shape answer of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Result(StatementResult),
    Dberror(ErrorPayload),
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Dberror(_))
    }

    /// Process exit status the host reports for this envelope.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Result(_) => 0,
            Self::Dberror(_) => 1,
        }
    }
}

impl From<Result<StatementResult>> for Envelope {
    fn from(result: Result<StatementResult>) -> Self {
        match result {
            Ok(result) => Self::Result(result),
            Err(e) => {
                error!("{}: {}", e.category(), e);
                Self::Dberror(ErrorPayload::from(&e))
            }
        }
    }
}

/// Runs one invocation end to end.
///
/// An unknown mode is rejected before any credentials are read or any
/// connection is opened.
pub async fn invoke(params: &InvocationParams, dispatcher: &Dispatcher) -> Envelope {
    run(params, dispatcher).await.into()
}

async fn run(params: &InvocationParams, dispatcher: &Dispatcher) -> Result<StatementResult> {
    let mode = params.mode()?;
    let descriptor = params.credentials.resolve()?;
    dispatcher.run(&descriptor, mode).await
}
