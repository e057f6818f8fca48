//! Command-line argument parsing for events-provision.
//!
//! The binary plays the hosting platform: it reads the parameters object,
//! lets flags override configuration, and prints the envelope.

use clap::Parser;
use events_provision::config::Config;
use events_provision::error::{ProvisionError, Result};
use events_provision::invocation::InvocationParams;
use std::io::Read;
use std::path::PathBuf;

/// Provisions, seeds and tears down the events table.
#[derive(Parser, Debug)]
#[command(name = "events-provision")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Invocation parameters JSON file ("-" or omitted reads stdin)
    #[arg(short = 'P', long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Mode to run, overriding the one in the parameters (setup, sampledata, cleanup)
    #[arg(short = 'm', long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Database backend (db2 or sqlite); detected from the descriptor when omitted
    #[arg(short = 'b', long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Schema qualifying the events table
    #[arg(short = 's', long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// ODBC driver name for Db2 connections
    #[arg(long, value_name = "NAME")]
    pub odbc_driver: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the statement for --mode and exit without connecting
    #[arg(long, requires = "mode")]
    pub print_sql: bool,

    /// Pretty-print the result envelope
    #[arg(long)]
    pub pretty: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Default log level for this run.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Applies flags over the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(backend) = &self.backend {
            config.database.backend = Some(backend.parse()?);
        }
        if let Some(schema) = &self.schema {
            config.database.schema = Some(schema.clone());
        }
        if let Some(driver) = &self.odbc_driver {
            config.database.odbc_driver = driver.clone();
        }
        Ok(())
    }

    /// Reads the parameters object and applies the --mode override.
    pub fn read_params(&self) -> Result<InvocationParams> {
        let json = match self.params.as_deref() {
            Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path).map_err(|e| {
                ProvisionError::config(format!(
                    "Failed to read parameters from {}: {e}",
                    path.display()
                ))
            })?,
            _ => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| ProvisionError::config(format!("Failed to read stdin: {e}")))?;
                buf
            }
        };

        let mut params = InvocationParams::from_json(&json)?;
        if let Some(mode) = &self.mode {
            params.set_mode(mode.as_str());
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events_provision::db::DatabaseBackend;
    use events_provision::mode::Mode;

    fn parse_args(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse_args(&["events-provision"]);
        assert_eq!(cli.params, None);
        assert_eq!(cli.mode, None);
        assert!(!cli.print_sql);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_parse_short_args() {
        let cli = parse_args(&[
            "events-provision",
            "-P",
            "params.json",
            "-m",
            "setup",
            "-b",
            "sqlite",
            "-s",
            "APPDATA",
            "-v",
        ]);

        assert_eq!(cli.params, Some(PathBuf::from("params.json")));
        assert_eq!(cli.mode, Some("setup".to_string()));
        assert_eq!(cli.backend, Some("sqlite".to_string()));
        assert_eq!(cli.schema, Some("APPDATA".to_string()));
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_print_sql_requires_mode() {
        let result = Cli::try_parse_from(["events-provision", "--print-sql"]);
        assert!(result.is_err());

        let cli = parse_args(&["events-provision", "--print-sql", "--mode", "cleanup"]);
        assert!(cli.print_sql);
    }

    #[test]
    fn test_apply_to_overrides_config() {
        let cli = parse_args(&[
            "events-provision",
            "--backend",
            "sqlite",
            "--odbc-driver",
            "Db2 CLI",
        ]);
        let mut config = Config::default();
        config.database.schema = Some("FROMFILE".to_string());

        cli.apply_to(&mut config).unwrap();

        assert_eq!(config.database.backend, Some(DatabaseBackend::Sqlite));
        assert_eq!(config.database.schema, Some("FROMFILE".to_string()));
        assert_eq!(config.database.odbc_driver, "Db2 CLI");
    }

    #[test]
    fn test_apply_to_bad_backend() {
        let cli = parse_args(&["events-provision", "--backend", "oracle"]);
        assert!(cli.apply_to(&mut Config::default()).is_err());
    }

    #[test]
    fn test_read_params_from_file_with_mode_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{"__bx_creds": {"db2": {"dsn": "DATABASE=x"}}, "mode": "setup"}"#,
        )
        .unwrap();

        let cli = parse_args(&[
            "events-provision",
            "--params",
            path.to_str().unwrap(),
            "--mode",
            "cleanup",
        ]);
        let params = cli.read_params().unwrap();

        assert_eq!(params.mode().unwrap(), Mode::Cleanup);
        assert_eq!(params.credentials.resolve().unwrap().expose(), "DATABASE=x");
    }

    #[test]
    fn test_read_params_missing_file() {
        let cli = parse_args(&["events-provision", "--params", "/no/such/params.json"]);
        let err = cli.read_params().unwrap_err();
        assert!(err.to_string().contains("/no/such/params.json"));
    }

    #[test]
    fn test_config_path_override() {
        let cli = parse_args(&["events-provision", "--config", "/etc/events.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/etc/events.toml"));
    }
}
