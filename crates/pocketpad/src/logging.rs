//! Logging setup for the relay binary.
//!
//! `RUST_LOG` takes precedence over the configured level.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Builds the filter: `RUST_LOG` when set, the configured level otherwise.
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = build_filter(settings);

    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false).with_thread_ids(true))
            .try_init()
            .map_err(|e| anyhow!("failed to install logger: {}", e))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .try_init()
            .map_err(|e| anyhow!("failed to install logger: {}", e))
    }
}
