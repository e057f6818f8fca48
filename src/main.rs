//! events-provision - sets up, seeds and cleans up the events table.

mod cli;

use cli::Cli;
use events_provision::config::Config;
use events_provision::db::{DatabaseBackend, DriverConnector};
use events_provision::dispatch::Dispatcher;
use events_provision::error::{ProvisionError, Result};
use events_provision::invocation::invoke;
use events_provision::logging;
use events_provision::mode::Mode;
use events_provision::statements::EventsTable;
use tracing::{debug, error};

/// Exit status for host-level failures (unreadable parameters, bad config).
const EXIT_HOST_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.log_level());

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            EXIT_HOST_FAILURE
        }
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> Result<i32> {
    // Precedence: CLI flags > environment > config file > defaults
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides()?;
    cli.apply_to(&mut config)?;

    let table = EventsTable::new(config.database.schema.as_deref())?;

    if cli.print_sql {
        let mode: Mode = cli.mode.as_deref().unwrap_or_default().parse()?;
        let backend = config.database.backend.unwrap_or(DatabaseBackend::Db2);
        println!("{}", table.statement(mode, backend));
        return Ok(0);
    }

    let params = cli.read_params()?;
    let dispatcher = Dispatcher::new(DriverConnector::new(config.database.odbc_driver), table)
        .with_backend(config.database.backend);

    let envelope = invoke(&params, &dispatcher).await;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    }
    .map_err(|e| ProvisionError::internal(format!("Failed to serialize envelope: {e}")))?;
    println!("{json}");

    Ok(envelope.exit_code())
}
