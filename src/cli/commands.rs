//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::http_server::{AppState, HttpServer};
use crate::observability::{init_logging, MetricsRegistry};
use crate::storage::Store;
use crate::teams::{send_reminders, Notifier, RosterService};

use super::args::{Cli, Command};
use super::config::AppConfig;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init { config } => init(&config),
        Command::Serve { config } => serve(&config),
        Command::Reminders { config, now } => reminders(&config, now.as_deref()),
    }
}

/// Write a default config with a fresh secret; never overwrites
pub fn init(config_path: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized(config_path));
    }

    AppConfig::generate().save(config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

fn open_store(config: &AppConfig) -> CliResult<Arc<Store>> {
    let store = match &config.data_file {
        Some(path) => Store::open(path)
            .map_err(|e| CliError::boot_failed(format!("Failed to open {}: {}", path.display(), e)))?,
        None => Store::in_memory(),
    };
    Ok(Arc::new(store))
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create runtime: {}", e)))
}

/// Start the HTTP API server
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    init_logging(config.log_format);

    let store = open_store(&config)?;
    let state = AppState::new(
        store,
        config.jwt_config(),
        config.session_config(),
        config.password_policy(),
    );
    let server = HttpServer::new(config.server.clone(), Arc::new(state));

    info!(
        addr = %server.socket_addr(),
        data_file = ?config.data_file,
        "starting roaster"
    );

    runtime()?.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server error: {}", e)))
    })
}

/// One reminder pass over accepted matches in the next 24 hours
pub fn reminders(config_path: &Path, now: Option<&str>) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    init_logging(config.log_format);

    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|e| CliError::invalid_argument(format!("Invalid --now '{}': {}", raw, e)))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let store = open_store(&config)?;
    let service = RosterService::new(store, Arc::new(MetricsRegistry::new()));
    let notifier = Notifier::from_config(config.smtp.as_ref())
        .map_err(|e| CliError::config_error(e.to_string()))?;

    let report = runtime()?
        .block_on(send_reminders(&service, &notifier, now))
        .map_err(|e| CliError::reminder_failed(e.to_string()))?;

    for reminder in &report.reminders {
        println!("{}", reminder.message());
    }
    println!("{}", report.summary());
    Ok(())
}
