//! PocketPad relay server.
//!
//! Loads configuration, installs logging, then runs the relay until SIGINT or
//! SIGTERM. A failed bind exits with a non-zero status.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use pocketpad_relay::{create_server_with_config, RelayError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::cli::CliArgs;
use crate::config::AppConfig;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

async fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load_from_file(&args.config).await?;
    config.apply_env_overrides()?;
    config.apply_cli(args)?;
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════╗");
    info!("║          🎮 POCKETPAD RELAY 🎮        ║");
    info!("║              v{:<23}║", version);
    info!("╚══════════════════════════════════════╝");
}

fn log_configuration(args: &CliArgs, config: &AppConfig) {
    info!("📋 Configuration Summary:");
    info!("  📂 Config file: {}", args.config.display());
    info!("  🌐 Bind address: {}", config.server.bind_address);
    info!("  ⏱️ Probe interval: {}ms", config.probe.interval_ms);
    match config.server.static_dir.as_str() {
        "" => info!("  🖼️ Controller UI: disabled"),
        dir => info!("  🖼️ Controller UI: {}", dir),
    }
    if config.server.channel_scoped_input {
        info!("  🔀 Input scoped to channels");
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let started = Instant::now();
    let config = load_config(&args).await?;
    logging::setup_logging(&config.logging)?;

    display_banner();
    log_configuration(&args, &config);

    let server = Arc::new(create_server_with_config(config.to_relay_config()?)?);
    let listener = server.bind().await?;
    info!("✅ Ready in {:.2?}", started.elapsed());

    let mut serving = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(listener).await })
    };

    tokio::select! {
        result = &mut serving => {
            return result.context("server task panicked")?.map_err(Into::into);
        }
        signal = signals::wait_for_shutdown_signal() => {
            signal?;
        }
    }

    info!("🛑 Shutdown signal received, stopping relay...");
    server.shutdown();
    match tokio::time::timeout(DRAIN_TIMEOUT, serving).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => warn!("Connections still open after {:?}, exiting", DRAIN_TIMEOUT),
    }

    let status = server.relay().status();
    info!(
        "👋 Relay stopped ({} frames dropped over the session)",
        status.frames_dropped
    );
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        match e.downcast_ref::<RelayError>() {
            Some(RelayError::Bind { address, .. }) => {
                error!("❌ Cannot listen on {}: {:#}", address, e);
            }
            // may fail before logging is installed
            _ => eprintln!("❌ Failed to run relay: {:#}", e),
        }
        std::process::exit(1);
    }
}
