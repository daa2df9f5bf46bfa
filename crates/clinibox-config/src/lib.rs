//! Layered configuration.
//!
//! Values resolve in order: built-in defaults, then an optional TOML file,
//! then `CLINIBOX__`-prefixed environment variables (double underscore as
//! the section separator, e.g. `CLINIBOX__REALTIME__POLL_INTERVAL_SECS=5`).

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Render error: {0}")]
    Render(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CliniboxConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CliniboxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.realtime.poll_interval_secs == 0 {
            return Err(ConfigError::validation(
                "realtime.poll_interval_secs must be > 0",
            ));
        }
        if self.realtime.event_buffer == 0 {
            return Err(ConfigError::validation("realtime.event_buffer must be > 0"));
        }
        if self.store.backend != "memory" {
            return Err(ConfigError::validation(format!(
                "store.backend '{}' is not supported (expected 'memory')",
                self.store.backend
            )));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }

    /// Renders the effective configuration as a TOML document, useful as a
    /// starting point for a config file.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend name. Only "memory" today.
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_backend() -> String {
    "memory".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Poll backstop cadence for subscriber refresh, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Broadcast channel capacity for change events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_poll_interval_secs() -> u64 {
    15
}
fn default_event_buffer() -> usize {
    1024
}

impl RealtimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Loads configuration from defaults, an optional TOML file and the
/// environment, then validates the merged result.
///
/// With no explicit path, `clinibox.toml` in the working directory is used
/// when present. A missing file is not an error; an invalid one is.
pub fn load_config(path: Option<&str>) -> Result<CliniboxConfig> {
    let mut builder = Config::builder();
    match path {
        Some(p) => {
            let pathbuf = PathBuf::from(p);
            if pathbuf.exists() {
                builder = builder.add_source(File::from(pathbuf));
            }
        }
        None => {
            let default_path = PathBuf::from("clinibox.toml");
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }
    builder = builder.add_source(
        Environment::with_prefix("CLINIBOX")
            .try_parsing(true)
            .separator("__"),
    );
    let merged: CliniboxConfig = builder.build()?.try_deserialize()?;
    merged.validate()?;
    Ok(merged)
}
