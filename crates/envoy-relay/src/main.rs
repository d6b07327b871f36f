//! envoy-relay - serves Envoy microinverter production data over HTTP.
//!
//! Logs into Enphase Enlighten with the configured account, keeps the Envoy
//! bearer token fresh, and answers `GET /production/` with the device's
//! `production.pcu` section.

mod server;

use std::io;

use anyhow::{Context, Result};
use envoy_relay_core::{ApiClient, Config, Session};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use server::AppState;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("envoy-relay starting");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(envoy = %config.device.base_url, serial = %config.credentials.serial, "Configuration loaded");

    let api = ApiClient::new(config.cloud.clone(), config.device.clone(), config.timeout)
        .context("Failed to create HTTP clients")?;
    let session = Session::new(api, config.credentials.clone());

    match session.prime().await {
        Ok(()) => info!("Initial Envoy token acquired"),
        Err(e) if e.is_fatal() => {
            error!(error = %e, "Enlighten login failed");
            return Err(e).context("Startup login failed");
        }
        Err(e) => warn!(error = %e, "Initial login failed, retrying on first request"),
    }

    server::run(AppState::new(session), config.bind).await?;

    info!("envoy-relay shutting down");
    Ok(())
}
