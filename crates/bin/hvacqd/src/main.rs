//! # hvacqd: hvacq daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Construct the simulated account, the event bus and the bridge
//! - Build the axum router over the bridge
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hvacq_adapter_http_axum::state::{AppState, HttpBridge};
use hvacq_adapter_virtual::VirtualHome;
use hvacq_app::event_bus::InProcessEventBus;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Remote account
    let home = Arc::new(VirtualHome::new(&config.simulated));
    tracing::info!(
        home = %home.home(),
        zones = config.simulated.zones.len(),
        daily_limit = config.simulated.daily_limit,
        "simulated account ready"
    );

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));

    // Bridge
    let bridge = Arc::new(HttpBridge::new(
        home.home(),
        Arc::clone(&home),
        Arc::clone(&home),
        Arc::clone(&event_bus),
        config.bridge_settings()?,
    )?);
    bridge.start();

    // HTTP
    let app = hvacq_adapter_http_axum::router::build(AppState::new(
        Arc::clone(&bridge),
        event_bus,
    ));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "hvacqd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bridge.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
