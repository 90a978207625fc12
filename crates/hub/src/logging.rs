//! Logging system setup.

use crate::config::LoggingSettings;
use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if settings.json_format {
        registry
            .with(fmt::layer().json().with_target(false).with_thread_ids(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(true))
            .try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

    info!("🔧 Logging initialized with level: {}", settings.level);
    Ok(())
}
