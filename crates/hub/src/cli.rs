//! Command-line argument parsing for the game hub.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the game hub.
///
/// Every option except `--config` overrides the matching setting from the
/// configuration file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Real-time two-player chess session server", long_about = None)]
pub struct CliArgs {
    /// Configuration file path
    ///
    /// If the file doesn't exist, a default configuration will be created.
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Bind address (e.g., 127.0.0.1:8080)
    #[arg(short, long, value_name = "ADDRESS")]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}
