//! # Encounter Tracker
//!
//! Host binary for the encounter tracker combat engine.
//!
//! This crate ties together:
//! - Configuration: timer loop, round timer and demo encounter settings
//! - Ticker: polls the round timer calculators on a clock
//! - App: runs a scripted encounter through the encounter service

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod ticker;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::TrackerConfig;

/// Main entry point.
#[tokio::main]
async fn main() -> Result<()> {
    // An explicit path on the command line must load; the platform config
    // dir falls back to defaults
    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::try_load_from(&path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => TrackerConfig::load(),
    };

    // Initialize tracing, RUST_LOG overrides the configured filter
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Encounter tracker starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run(config).await?;

    info!("Encounter tracker shutdown complete");
    Ok(())
}
