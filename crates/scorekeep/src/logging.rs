//! Logging system setup and configuration.
//!
//! Builds the tracing subscriber from the `[logging]` config section:
//! level filter, text or JSON output, and an optional append-mode log
//! file.

use crate::config::LoggingSettings;
use std::fs::File;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// `json_format` is the CLI override; either it or the config flag turns
/// on JSON output. When `file_path` is set the log is appended there
/// (without ANSI colors), otherwise it goes to stdout.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::new(&config.level);
    let json = json_format || config.json_format;

    match &config.file_path {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            let writer = Arc::new(file);
            if json {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
            }
        }
        None => {
            if json {
                tracing_subscriber::fmt().json().with_env_filter(filter).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(filter).init();
            }
        }
    }

    info!(
        "Logging ready: level {}, {} output",
        config.level,
        if json { "json" } else { "text" }
    );
    Ok(())
}

/// Displays the startup banner using proper logging.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║           📊 SCOREKEEP DAEMON 📊         ║");
    info!("║               v{}                     ║", version);
    info!("║                                          ║");
    info!("║  Game-Server Telemetry & Player Stats    ║");
    info!("║                                          ║");
    info!("║  🎯 Typed Event Processing               ║");
    info!("║  🔁 At-Least-Once Queue Delivery         ║");
    info!("║  👥 Live Session Tracking                ║");
    info!("║  📡 RCON Health Monitoring               ║");
    info!("╚══════════════════════════════════════════╝");
}
