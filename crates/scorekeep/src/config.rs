//! Configuration management for the Scorekeep telemetry daemon.
//!
//! This module handles loading, validation, and conversion of daemon
//! configuration from TOML files and command-line arguments.

use serde::{Deserialize, Serialize};
use stat_engine::{BackoffConfig, MonitorConfig};
use std::path::PathBuf;
use tracing::info;

fn default_listen_address() -> String {
    "0.0.0.0:27500".to_string()
}

fn default_dedupe_capacity() -> usize {
    4096
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_base_delay_secs() -> u64 {
    30
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_minutes() -> u64 {
    30
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_dormant_retry_minutes() -> u64 {
    120
}

fn default_command_prefix() -> String {
    "hlx_event".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ingest and processing settings
    pub daemon: DaemonSettings,
    /// RCON monitor settings
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Notification defaults
    #[serde(default)]
    pub notifications: NotificationSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
    /// Game servers known to a standalone (in-memory) deployment
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// Queue-ingest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    /// UDP address queue messages arrive on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Capacity of the recently-processed event-id cache
    #[serde(default = "default_dedupe_capacity")]
    pub dedupe_capacity: usize,
}

/// RCON monitor and retry-backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_backoff_minutes")]
    pub max_backoff_minutes: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_dormant_retry_minutes")]
    pub dormant_retry_minutes: u64,
}

/// Notification defaults applied when a server has no stored config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

/// One game server for standalone deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: i64,
    pub name: String,
    pub game: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            base_delay_secs: default_base_delay_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_minutes: default_max_backoff_minutes(),
            max_consecutive_failures: default_max_consecutive_failures(),
            dormant_retry_minutes: default_dormant_retry_minutes(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { command_prefix: default_command_prefix() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings {
                listen_address: default_listen_address(),
                dedupe_capacity: default_dedupe_capacity(),
            },
            monitor: MonitorSettings::default(),
            notifications: NotificationSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
            servers: vec![ServerEntry {
                id: 1,
                name: "local".to_string(),
                game: "cstrike".to_string(),
            }],
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the monitor section into the core's monitor config.
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval_secs: self.monitor.poll_interval_secs,
            backoff: BackoffConfig {
                base_delay_secs: self.monitor.base_delay_secs,
                backoff_multiplier: self.monitor.backoff_multiplier,
                max_backoff_minutes: self.monitor.max_backoff_minutes,
                max_consecutive_failures: self.monitor.max_consecutive_failures,
                dormant_retry_minutes: self.monitor.dormant_retry_minutes,
            },
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.daemon.listen_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid listen address: {}", &self.daemon.listen_address));
        }

        if self.daemon.dedupe_capacity == 0 {
            return Err("daemon.dedupe_capacity must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.monitor.backoff_multiplier < 1.0 {
            return Err("monitor.backoff_multiplier must be at least 1.0".to_string());
        }
        if self.monitor.max_consecutive_failures == 0 {
            return Err("monitor.max_consecutive_failures must be greater than 0".to_string());
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err("monitor.poll_interval_secs must be greater than 0".to_string());
        }

        let mut ids: Vec<i64> = self.servers.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.servers.len() {
            return Err("server ids must be unique".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.daemon.listen_address, "0.0.0.0:27500");
        assert_eq!(config.daemon.dedupe_capacity, 4096);
        assert_eq!(config.monitor.poll_interval_secs, 60);
        assert_eq!(config.monitor.base_delay_secs, 30);
        assert_eq!(config.monitor.backoff_multiplier, 2.0);
        assert_eq!(config.monitor.max_consecutive_failures, 5);
        assert_eq!(config.notifications.command_prefix, "hlx_event");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_listen_address() {
        let mut config = AppConfig::default();
        config.daemon.listen_address = "not an address".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid listen address"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid log level"));
    }

    #[test]
    fn test_validation_monitor_bounds() {
        let mut config = AppConfig::default();
        config.monitor.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        config.monitor.backoff_multiplier = 2.0;
        config.monitor.max_consecutive_failures = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_duplicate_server_ids() {
        let mut config = AppConfig::default();
        config.servers = vec![
            ServerEntry { id: 1, name: "a".to_string(), game: "cstrike".to_string() },
            ServerEntry { id: 1, name: "b".to_string(), game: "cstrike".to_string() },
        ];
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("unique"));
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.daemon.listen_address, "0.0.0.0:27500");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[daemon]
listen_address = "127.0.0.1:9999"
dedupe_capacity = 512

[monitor]
poll_interval_secs = 15
base_delay_secs = 10
backoff_multiplier = 3.0

[logging]
level = "debug"
json_format = true

[[servers]]
id = 7
name = "public"
game = "tf"
"#;
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await.unwrap();
        assert_eq!(config.daemon.listen_address, "127.0.0.1:9999");
        assert_eq!(config.daemon.dedupe_capacity, 512);
        assert_eq!(config.monitor.poll_interval_secs, 15);
        assert_eq!(config.monitor.base_delay_secs, 10);
        assert_eq!(config.monitor.backoff_multiplier, 3.0);
        // Unset monitor fields fall back to defaults.
        assert_eq!(config.monitor.max_consecutive_failures, 5);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].id, 7);
        assert_eq!(config.servers[0].game, "tf");
    }

    #[test]
    fn test_to_monitor_config_conversion() {
        let mut config = AppConfig::default();
        config.monitor.poll_interval_secs = 30;
        config.monitor.dormant_retry_minutes = 240;

        let monitor = config.to_monitor_config();
        assert_eq!(monitor.poll_interval_secs, 30);
        assert_eq!(monitor.backoff.dormant_retry_minutes, 240);
        assert_eq!(monitor.backoff.base_delay_secs, 30);
    }
}
