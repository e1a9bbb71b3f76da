//! Runtime configuration.
//!
//! Read from `~/.fallwatch/config.toml` when present, defaults otherwise. The
//! appliance base address is the only setting most installs touch; it is read
//! once and shared read-only by every component of a session.

use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MonitorError, Result};

pub const CONFIG_ENV: &str = "FALLWATCH_CONFIG";
pub const APPLIANCE_URL_ENV: &str = "FALLWATCH_APPLIANCE_URL";

const CONFIG_DIR: &str = ".fallwatch";
const CONFIG_FILE: &str = "config.toml";

const DEFAULT_APPLIANCE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_CLIPS_URL: &str = "http://localhost:5000";
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
const DEFAULT_FALL_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_FEED_SETTLE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

const MAX_INTERVAL_SECS: u64 = 86_400;
const MAX_FEED_SETTLE_MS: u64 = 60_000;
const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub appliance_url: String,
    pub clips_url: String,
    pub heartbeat_interval_secs: u64,
    pub fall_poll_interval_secs: u64,
    pub feed_settle_ms: u64,
    pub request_timeout_ms: u64,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Operator signed in on this machine. No operator means no session.
    pub user: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            appliance_url: DEFAULT_APPLIANCE_URL.to_string(),
            clips_url: DEFAULT_CLIPS_URL.to_string(),
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            fall_poll_interval_secs: DEFAULT_FALL_POLL_INTERVAL_SECS,
            feed_settle_ms: DEFAULT_FEED_SETTLE_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            identity: IdentityConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn fall_poll_interval(&self) -> Duration {
        Duration::from_secs(self.fall_poll_interval_secs)
    }

    pub fn feed_settle_delay(&self) -> Duration {
        Duration::from_millis(self.feed_settle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn appliance_base(&self) -> Result<Url> {
        parse_base_url("appliance_url", &self.appliance_url)
    }

    pub fn clips_base(&self) -> Result<Url> {
        parse_base_url("clips_url", &self.clips_url)
    }

    pub fn validate(&self) -> Result<()> {
        self.appliance_base()?;
        self.clips_base()?;
        for (field, value, max) in [
            (
                "heartbeat_interval_secs",
                self.heartbeat_interval_secs,
                MAX_INTERVAL_SECS,
            ),
            (
                "fall_poll_interval_secs",
                self.fall_poll_interval_secs,
                MAX_INTERVAL_SECS,
            ),
            (
                "request_timeout_ms",
                self.request_timeout_ms,
                MAX_REQUEST_TIMEOUT_MS,
            ),
        ] {
            if value == 0 {
                return Err(MonitorError::ConfigInvalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            if value > max {
                return Err(MonitorError::ConfigInvalid {
                    field,
                    reason: format!("{} exceeds the maximum of {}", value, max),
                });
            }
        }
        if self.feed_settle_ms > MAX_FEED_SETTLE_MS {
            return Err(MonitorError::ConfigInvalid {
                field: "feed_settle_ms",
                reason: format!(
                    "{} exceeds the maximum of {}",
                    self.feed_settle_ms, MAX_FEED_SETTLE_MS
                ),
            });
        }
        Ok(())
    }
}

/// Returns `~/.fallwatch/config.toml`, or the `FALLWATCH_CONFIG` override.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().ok_or(MonitorError::HomeDirNotFound)?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Returns `~/.fallwatch`, where the CLI keeps its log files.
pub fn state_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(MonitorError::HomeDirNotFound)?;
    Ok(home.join(CONFIG_DIR))
}

/// Loads configuration from `path` (or the default location), applies the
/// environment override for the appliance address, and validates the result.
pub fn load_config(path: Option<PathBuf>) -> Result<MonitorConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    let mut config = read_config_file(&config_path)?;

    if let Ok(url) = env::var(APPLIANCE_URL_ENV) {
        if !url.trim().is_empty() {
            config.appliance_url = url.trim().to_string();
        }
    }

    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<MonitorConfig> {
    if !path.exists() {
        return Ok(MonitorConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| MonitorError::Io {
        context: format!("Failed to read config {}", path.display()),
        source,
    })?;
    toml::from_str::<MonitorConfig>(&content).map_err(|err| MonitorError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn parse_base_url(field: &'static str, value: &str) -> Result<Url> {
    let url = Url::parse(value.trim()).map_err(|err| MonitorError::ConfigInvalid {
        field,
        reason: format!("{}: {}", value, err),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MonitorError::ConfigInvalid {
            field,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}
