//! Operation selector.

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The operation to run against the events table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Create the table.
    Setup,
    /// Insert the two sample rows.
    SampleData,
    /// Drop the table.
    Cleanup,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Setup, Mode::SampleData, Mode::Cleanup];

    /// Returns the mode as it appears in invocation parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::SampleData => "sampledata",
            Self::Cleanup => "cleanup",
        }
    }

    /// True for the modes that create or drop the table rather than touch rows.
    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::Setup | Self::Cleanup)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ProvisionError;

    /// Parsing is exact: the hosting platform passes the literal values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ProvisionError::UnknownMode(s.to_string()))
    }
}
