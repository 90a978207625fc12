//! Entry point of the `game-hub` binary.
//!
//! Parses the command line, loads and validates the configuration file,
//! installs logging and runs the hub until a termination signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use config::AppConfig;
use game_hub::GameHubServer;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Configuration is loaded before logging exists; failures go to stderr.
    let mut config = AppConfig::load_from_file(&args.config).await?;
    config.apply_overrides(&args);
    config
        .validate()
        .context("Configuration validation failed")?;

    logging::setup_logging(&config.logging)?;

    let hub_config = config.hub_config();
    info!("♟️ Game hub v{}", env!("CARGO_PKG_VERSION"));
    info!("📂 Config: {}", args.config.display());
    info!("  🌐 Bind address: {}", hub_config.bind_address);
    info!(
        "  📬 Queues: {} outbound per client, {} events per session",
        hub_config.outbound_queue_capacity, hub_config.event_queue_capacity
    );
    info!(
        "  ⏱️ Write wait {}s, pong wait {}s, max message {} bytes",
        hub_config.write_wait_secs, hub_config.pong_wait_secs, hub_config.max_message_size
    );
    if hub_config.allowed_origins.is_empty() {
        info!("  🔓 Accepting connections from any origin");
    } else {
        info!("  🔒 Allowed origins: {:?}", hub_config.allowed_origins);
    }

    let server = Arc::new(GameHubServer::new(hub_config));
    let mut serving = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    info!("🛑 Press Ctrl+C to gracefully shutdown");
    tokio::select! {
        signal = signals::wait_for_shutdown() => {
            let signal = signal.context("Failed to install signal handlers")?;
            info!("📡 Received {}, initiating graceful shutdown...", signal);
            server.shutdown();
            serving.await.context("Server task failed")??;
        }
        result = &mut serving => {
            // The server stopped without being asked to.
            if let Err(e) = result.context("Server task failed")? {
                error!("❌ Server error: {}", e);
                return Err(e.into());
            }
        }
    }

    info!("👋 Game hub shutdown complete");
    Ok(())
}
