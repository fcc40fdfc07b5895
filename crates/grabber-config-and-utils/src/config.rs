//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use reconnect_policy::BackoffConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use stream_session::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_STALL_TIMEOUT, DEFAULT_STREAM_URL, DEFAULT_USER_AGENT,
};
use url::Url;

pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "TWGRABBER_LOG_LEVEL";
const ENV_STREAM_URL: &str = "TWGRABBER_STREAM_URL";
const ENV_MAX_RETRIES: &str = "TWGRABBER_MAX_RETRIES";

/// Grabber configuration. Every field is optional in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Filtered-stream endpoint.
    pub stream_url: String,
    /// Seconds without any data before a connection is considered stalled.
    pub stall_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub backoff: BackoffConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            stall_timeout_secs: DEFAULT_STALL_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl Config {
    /// Load `config.json` under `paths` if present, apply environment
    /// overrides, and validate.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from environment variables read through `lookup`.
    ///
    /// `TWGRABBER_MAX_RETRIES` accepts a count or `unlimited`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<()> {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(url) = lookup(ENV_STREAM_URL).filter(|v| !v.trim().is_empty()) {
            self.stream_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            self.backoff.max_retries = parse_max_retries(&raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        let url = self.stream_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "stream_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.stall_timeout_secs == 0 {
            return Err(CoreError::Config("stall_timeout_secs must be positive".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(CoreError::Config("connect_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn stream_url(&self) -> CoreResult<Url> {
        Url::parse(&self.stream_url).map_err(CoreError::from)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_max_retries(raw: &str) -> CoreResult<Option<u32>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unlimited") {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| {
            CoreError::Config(format!(
                "{ENV_MAX_RETRIES} must be a count or 'unlimited', got {raw:?}"
            ))
        })
}
