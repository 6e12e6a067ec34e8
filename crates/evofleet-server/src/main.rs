//! evofleet server binary.
//!
//! Wires together configuration, logging, the fleet actor and the
//! dashboard API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `evofleet-config.yaml` (or `EVOFLEET_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the fleet and its actor channel
//! 4. Spawn the fleet actor with the observer callback
//! 5. Serve the feed and dashboard API until `Ctrl-C`

mod error;
mod observer_callback;

use std::sync::Arc;

use evofleet_core::config::{AppConfig, LogFormat, LoggingConfig};
use evofleet_core::fleet::Fleet;
use evofleet_core::runner;
use evofleet_observer::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;
use crate::observer_callback::ObserverCallback;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Config comes first so the log level can be taken from it.
    let (config, config_path) = AppConfig::load()?;
    init_tracing(&config.logging);

    info!("evofleet-server starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        bucket_width_ms = config.aggregation.bucket_width_ms,
        channel_capacity = config.fleet.channel_capacity,
        broadcast_capacity = config.fleet.broadcast_capacity,
        population = config.run.population,
        "Fleet settings"
    );

    let bind_addr = config.server.bind_addr();
    let fleet = Fleet::new(config.aggregation.bucket_width(), config.run);
    let (handle, inputs) = runner::channel(config.fleet.channel_capacity);
    let app_state = Arc::new(AppState::new(
        handle,
        fleet.snapshot(),
        config.fleet.broadcast_capacity,
    ));

    let mut callback = ObserverCallback::new(Arc::clone(&app_state));
    let actor = tokio::spawn(async move { runner::run_fleet(fleet, inputs, &mut callback).await });

    let served = evofleet_observer::start_server(&bind_addr, app_state).await;

    // The callback holds the last handle, so the actor never drains on its own.
    actor.abort();
    served?;

    info!("evofleet-server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
