//! ==============================================================================
//! config.rs - runtime configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sink.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     the bind address overrides from the environment.
//!
//! structure:
//!     - ServerConfig: where the http server listens.
//!     - LoggingConfig: log filter and whether to echo every payload.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HOST_ENV: &str = "POSTURE_SINK_HOST";
pub const PORT_ENV: &str = "POSTURE_SINK_PORT";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct SinkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_payloads: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_payloads: false }
    }
}

impl SinkConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("failed to parse config")
    }

    /// Load with default fallback.
    ///
    /// Runs before the log subscriber exists, so problems are returned as
    /// messages for the caller to log once tracing is up.
    pub fn load_or_default() -> (Self, Vec<String>) {
        let paths = [
            PathBuf::from("config").join("sink.toml"),
            PathBuf::from("..").join("config").join("sink.toml"),
        ];
        let mut notes = Vec::new();

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        notes.push(format!("loaded config from {}", path.display()));
                        return (config, notes);
                    }
                    Err(e) => {
                        notes.push(format!("failed to load {}: {:#}", path.display(), e));
                    }
                }
            }
        }

        notes.push("no usable config file found - using defaults".to_string());
        (Self::default(), notes)
    }

    /// Apply POSTURE_SINK_HOST / POSTURE_SINK_PORT
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok());
    }

    fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("ignoring {}={:?}: not a valid port", PORT_ENV, port),
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!(
            bind = %self.bind_addr(),
            log_level = %self.logging.level,
            show_payloads = self.logging.show_payloads,
            "configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_firmware_target() {
        let config = SinkConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.show_payloads);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SinkConfig::parse("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn full_file() {
        let config = SinkConfig::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [logging]
            level = "debug"
            show_payloads = true
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.show_payloads);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(SinkConfig::parse("[server\nport = ").is_err());
        assert!(SinkConfig::parse("[server]\nport = \"high\"").is_err());
    }

    #[test]
    fn overrides() {
        let mut config = SinkConfig::default();
        config.apply_overrides(Some("127.0.0.1".into()), Some("6000".into()));
        assert_eq!(config.bind_addr(), "127.0.0.1:6000");

        config.apply_overrides(Some("  ".into()), Some("not-a-port".into()));
        assert_eq!(config.bind_addr(), "127.0.0.1:6000");
    }
}
