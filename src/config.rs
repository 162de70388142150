use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::session::Timeouts;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 10000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for quick commands (`set_param`, `record ...`).
    pub command_ms: u64,
    /// Deadline for listing and reloading instruments.
    pub list_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_ms: 1000,
            list_ms: 5000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
    /// `log` level filter name, e.g. `debug`. Falls back to `RUST_LOG`, then `info`.
    pub level: Option<String>,
}

impl Config {
    /// Read a TOML config file. Unknown keys are ignored, missing ones defaulted.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            command: Duration::from_millis(self.timeouts.command_ms),
            long: Duration::from_millis(self.timeouts.list_ms),
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log
            .level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}
