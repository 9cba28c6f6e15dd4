//! Hub configuration.
//!
//! Loaded from a TOML file (every field optional), then overridden by `HUB_*`
//! environment variables. Provider client credentials are not part of this
//! file; each connector reads its own from the environment.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Upper bound for `oauth.state_ttl_secs`: a consent screen left open for a day.
pub const MAX_STATE_TTL_SECS: u64 = 86_400;

/// Complete hub configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub oauth: OAuthSettings,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public base URL used to build OAuth callback URLs
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_callback_base_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            callback_base_url: default_callback_base_url(),
        }
    }
}

/// Defaults applied to every provider call
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-attempt timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional attempts after the first
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

/// OAuth flow settings
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthSettings {
    /// How long a CSRF state token stays valid (seconds)
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
    /// How often expired state tokens are purged (seconds)
    #[serde(default = "default_state_cleanup_interval_secs")]
    pub state_cleanup_interval_secs: u64,
}

fn default_state_ttl_secs() -> u64 {
    600
}

fn default_state_cleanup_interval_secs() -> u64 {
    60
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            state_ttl_secs: default_state_ttl_secs(),
            state_cleanup_interval_secs: default_state_cleanup_interval_secs(),
        }
    }
}

impl HubConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: HubConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `HUB_CONFIG` if set, else defaults, then apply environment
    /// overrides.
    pub fn from_env() -> Result<Self> {
        match std::env::var("HUB_CONFIG") {
            Ok(path) => Self::load(path),
            Err(_) => {
                let mut config = Self::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("HUB_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Ok(v) = std::env::var("HUB_CALLBACK_BASE_URL") {
            self.server.callback_base_url = v;
        }
        if let Ok(v) = std::env::var("HUB_FETCH_TIMEOUT_SECS") {
            self.fetch.timeout_secs = v
                .parse()
                .context("HUB_FETCH_TIMEOUT_SECS must be a number of seconds")?;
        }
        if let Ok(v) = std::env::var("HUB_FETCH_RETRIES") {
            self.fetch.retries = v
                .parse()
                .context("HUB_FETCH_RETRIES must be a non-negative integer")?;
        }
        if let Ok(v) = std::env::var("HUB_OAUTH_STATE_TTL_SECS") {
            self.oauth.state_ttl_secs = v
                .parse()
                .context("HUB_OAUTH_STATE_TTL_SECS must be a number of seconds")?;
        }
        Ok(())
    }

    /// Rejects values the runtime cannot run with: a zero timeout fails every
    /// call, a zero cleanup interval stops the purge loop.
    fn validate(&self) -> Result<()> {
        ensure!(
            self.fetch.timeout_secs > 0,
            "fetch.timeout_secs (HUB_FETCH_TIMEOUT_SECS) must be greater than zero"
        );
        ensure!(
            (1..=MAX_STATE_TTL_SECS).contains(&self.oauth.state_ttl_secs),
            "oauth.state_ttl_secs (HUB_OAUTH_STATE_TTL_SECS) must be between 1 and {}, got {}",
            MAX_STATE_TTL_SECS,
            self.oauth.state_ttl_secs
        );
        ensure!(
            self.oauth.state_cleanup_interval_secs > 0,
            "oauth.state_cleanup_interval_secs must be greater than zero"
        );
        Ok(())
    }
}
