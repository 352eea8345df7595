//! Configuration management for Newswire.
//!
//! Configuration is read from `~/.config/newswire/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The `NEWS_API_KEY` environment variable takes precedence over `api.api_key`.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "NEWS_API_KEY";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub timeouts: TimeoutConfig,
    pub paging: PagingConfig,
    pub cache: CacheConfig,
}

/// Upstream endpoint and request defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Country code sent to the top-headlines endpoint
    pub country: String,
    /// Language filter for the everything endpoint (empty = any)
    pub language: Option<String>,
    /// Search query used before the user types anything
    pub default_query: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/".to_string(),
            api_key: String::new(),
            country: "id".to_string(),
            language: Some("id".to_string()),
            default_query: "indonesia".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum gap between one call completing and the next being dispatched
    pub min_spacing_ms: u64,
    /// Wait used when a 429 carries no usable Retry-After header
    pub retry_after_fallback_secs: u64,
    /// Upper bound on any Retry-After wait
    pub retry_after_cap_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: 1200,
            retry_after_fallback_secs: 2,
            retry_after_cap_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn retry_after_fallback(&self) -> Duration {
        Duration::from_secs(self.retry_after_fallback_secs)
    }

    pub fn retry_after_cap(&self) -> Duration {
        Duration::from_secs(self.retry_after_cap_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub read_secs: u64,
    pub call_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 20,
            read_secs: 20,
            call_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn call(&self) -> Duration {
        Duration::from_secs(self.call_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Page size hint passed to every page source
    pub page_size: u32,
    pub headlines_max_page_size: u32,
    pub everything_max_page_size: u32,
    /// Quiet period before a parameter change restarts paging
    pub debounce_ms: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            headlines_max_page_size: 10,
            everything_max_page_size: 20,
            debounce_ms: 250,
        }
    }
}

impl PagingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 32,
            ttl_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default().with_env_overrides());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config.with_env_overrides())
    }

    /// Get the default config file path: `~/.config/newswire/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("newswire").join("config.toml"))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api.api_key = key;
            }
        }
        self
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Newswire Configuration

[api]
base_url = "https://newsapi.org/"
# Leave empty and export NEWS_API_KEY instead to keep the key out of this file
api_key = ""
country = "id"
language = "id"
default_query = "indonesia"

[rate_limit]
# Minimum gap between upstream calls (milliseconds)
min_spacing_ms = 1200
# Wait used when a 429 response has no usable Retry-After header
retry_after_fallback_secs = 2
# Never wait longer than this on a 429, whatever the server asks for
retry_after_cap_secs = 60

[timeouts]
connect_secs = 20
read_secs = 20
call_secs = 30

[paging]
page_size = 10
headlines_max_page_size = 10
everything_max_page_size = 20
# Quiet period after a query edit before paging restarts (milliseconds)
debounce_ms = 250

[cache]
# Short-lived in-memory cache for identical requests
enabled = true
capacity = 32
ttl_secs = 30
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
