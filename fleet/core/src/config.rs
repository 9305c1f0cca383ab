//! TOML Configuration File Support
//!
//! Configuration for the fleet console, read from
//! `$XDG_CONFIG_HOME/fleet/fleet.toml` (typically `~/.config/fleet/fleet.toml`).
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! connect_timeout_ms = 5000
//! request_timeout_ms = 30000
//!
//! [feed]
//! interval_ms = 2000
//! retention = 100
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Setting |
//! |---|---|
//! | `FLEET_API_BASE` | `api.base_url` |
//! | `FLEET_CONNECT_TIMEOUT_MS` | `api.connect_timeout_ms` |
//! | `FLEET_REQUEST_TIMEOUT_MS` | `api.request_timeout_ms` |
//! | `FLEET_FEED_INTERVAL_MS` | `feed.interval_ms` |
//! | `FLEET_FEED_RETENTION` | `feed.retention` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::{DEFAULT_INTERVAL, DEFAULT_RETENTION};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Base URL of the fleet API
    pub base_url: Option<String>,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request timeout for CRUD calls in milliseconds
    pub request_timeout_ms: Option<u64>,
}

/// `[feed]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedToml {
    /// Time between simulated emissions in milliseconds
    pub interval_ms: Option<u64>,
    /// Entries kept before the oldest are dropped
    pub retention: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetToml {
    /// API section
    pub api: ApiToml,
    /// Feed section
    pub feed: FeedToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// API connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// TCP connect timeout (applies to streams too)
    pub connect_timeout: Duration,
    /// Whole-request timeout (CRUD calls only; streams are unbounded)
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_millis(5000),
            request_timeout: Duration::from_millis(30_000),
        }
    }
}

/// Activity feed settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedConfig {
    /// Time between emissions
    pub interval: Duration,
    /// Retention cap
    pub retention: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            retention: DEFAULT_RETENTION,
        }
    }
}

/// Fully resolved configuration
///
/// Use [`load_config`] to build one with proper priority handling.
#[derive(Clone, Debug, Default)]
pub struct FleetConfig {
    /// API settings
    pub api: ApiConfig,
    /// Feed settings
    pub feed: FeedConfig,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    sources: BTreeMap<&'static str, ConfigSource>,
}

impl FleetConfig {
    /// Configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the value for `key` (e.g. `"api.base_url"`) came from
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.sources.get(key).copied().unwrap_or(ConfigSource::Default)
    }

    /// Every non-default value and where it came from
    pub fn overridden(&self) -> impl Iterator<Item = (&'static str, ConfigSource)> + '_ {
        self.sources.iter().map(|(k, v)| (*k, *v))
    }

    fn mark(&mut self, key: &'static str, source: ConfigSource) {
        self.sources.insert(key, source);
    }

    /// Check that every value is usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!("api.base_url '{}': {e}", self.api.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.api.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api.connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.feed.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "feed.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.feed.retention == 0 {
            return Err(ConfigError::ValidationError(
                "feed.retention must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/fleet/fleet.toml` or `~/.config/fleet/fleet.toml`
/// if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fleet").join("fleet.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// result fails validation. A missing config file is not an error.
pub fn load_config() -> Result<FleetConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the result
/// fails validation.
pub fn load_config_from_path(path: Option<&Path>) -> Result<FleetConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<FleetConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = FleetConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;

            let toml_config: FleetToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.to_path_buf());

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut FleetConfig, toml: &FleetToml) {
    if let Some(ref base) = toml.api.base_url {
        config.api.base_url = base.trim_end_matches('/').to_string();
        config.mark("api.base_url", ConfigSource::File);
    }
    if let Some(ms) = toml.api.connect_timeout_ms {
        config.api.connect_timeout = Duration::from_millis(ms);
        config.mark("api.connect_timeout_ms", ConfigSource::File);
    }
    if let Some(ms) = toml.api.request_timeout_ms {
        config.api.request_timeout = Duration::from_millis(ms);
        config.mark("api.request_timeout_ms", ConfigSource::File);
    }
    if let Some(ms) = toml.feed.interval_ms {
        config.feed.interval = Duration::from_millis(ms);
        config.mark("feed.interval_ms", ConfigSource::File);
    }
    if let Some(retention) = toml.feed.retention {
        config.feed.retention = retention;
        config.mark("feed.retention", ConfigSource::File);
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("{var}='{raw}': {e}")))
}

/// Apply environment variable overrides
///
/// Unlike a missing variable, a set but unparsable one is an error.
fn apply_env_config<F>(config: &mut FleetConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = env("FLEET_API_BASE").filter(|v| !v.trim().is_empty()) {
        config.api.base_url = base.trim().trim_end_matches('/').to_string();
        config.mark("api.base_url", ConfigSource::Env);
    }
    if let Some(raw) = env("FLEET_CONNECT_TIMEOUT_MS") {
        config.api.connect_timeout =
            Duration::from_millis(parse_env("FLEET_CONNECT_TIMEOUT_MS", &raw)?);
        config.mark("api.connect_timeout_ms", ConfigSource::Env);
    }
    if let Some(raw) = env("FLEET_REQUEST_TIMEOUT_MS") {
        config.api.request_timeout =
            Duration::from_millis(parse_env("FLEET_REQUEST_TIMEOUT_MS", &raw)?);
        config.mark("api.request_timeout_ms", ConfigSource::Env);
    }
    if let Some(raw) = env("FLEET_FEED_INTERVAL_MS") {
        config.feed.interval = Duration::from_millis(parse_env("FLEET_FEED_INTERVAL_MS", &raw)?);
        config.mark("feed.interval_ms", ConfigSource::Env);
    }
    if let Some(raw) = env("FLEET_FEED_RETENTION") {
        config.feed.retention = parse_env("FLEET_FEED_RETENTION", &raw)?;
        config.mark("feed.retention", ConfigSource::Env);
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// API base URL override
    pub api_base: Option<String>,
    /// Feed interval override (milliseconds)
    pub feed_interval_ms: Option<u64>,
    /// Feed retention override
    pub feed_retention: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set API base URL override
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set feed interval override
    #[must_use]
    pub fn with_feed_interval_ms(mut self, ms: u64) -> Self {
        self.feed_interval_ms = Some(ms);
        self
    }

    /// Set feed retention override
    #[must_use]
    pub fn with_feed_retention(mut self, retention: usize) -> Self {
        self.feed_retention = Some(retention);
        self
    }

    /// Apply overrides and re-validate
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is unusable.
    pub fn apply(&self, config: &mut FleetConfig) -> Result<(), ConfigError> {
        if let Some(ref base) = self.api_base {
            config.api.base_url = base.trim_end_matches('/').to_string();
            config.mark("api.base_url", ConfigSource::Cli);
        }
        if let Some(ms) = self.feed_interval_ms {
            config.feed.interval = Duration::from_millis(ms);
            config.mark("feed.interval_ms", ConfigSource::Cli);
        }
        if let Some(retention) = self.feed_retention {
            config.feed.retention = retention;
            config.mark("feed.retention", ConfigSource::Cli);
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
