//! events-provision - provisions, seeds and tears down the `events` table.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod config;
pub mod credentials;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod mode;
pub mod statements;
