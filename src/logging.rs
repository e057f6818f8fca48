//! Logging configuration.
//!
//! Logs always go to stderr: stdout carries nothing but the result envelope.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_stderr_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
