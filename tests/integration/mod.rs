//! Integration tests for events-provision.

pub mod cli_test;
pub mod db2_test;
pub mod sqlite_test;
