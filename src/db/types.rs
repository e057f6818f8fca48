//! Statement result types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single statement as reported by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    /// Rows affected, when the driver reports a count.
    pub rows_affected: Option<u64>,

    /// Time taken to execute the statement.
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
}

impl ExecOutcome {
    pub fn new(rows_affected: Option<u64>) -> Self {
        Self {
            rows_affected,
            execution_time: Duration::ZERO,
        }
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }
}

/// Serde support for Duration as whole milliseconds.
pub(crate) mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
