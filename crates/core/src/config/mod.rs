//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (QUIRE_*)
//! 2. TOML config file (if QUIRE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache adapter backs the server-side cache tier.
///
/// Chosen once per process: `memory` for short-lived or stateless deployments,
/// `directory` for long-lived processes that should keep entries across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    #[default]
    Directory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (QUIRE_*)
/// 2. TOML config file (if QUIRE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the LMS that content is fetched from.
    ///
    /// Set via QUIRE_ORIGIN_URL environment variable.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// LMS web service token.
    ///
    /// Set via QUIRE_LMS_TOKEN environment variable.
    /// Required only when content has to be fetched from the origin.
    #[serde(default)]
    pub lms_token: Option<String>,

    /// Server-side cache adapter.
    ///
    /// Set via QUIRE_CACHE_BACKEND environment variable (`memory` or `directory`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Lifetime of in-memory cache entries in seconds.
    ///
    /// Set via QUIRE_CACHE_TTL_SECS environment variable. Applies to the
    /// `memory` backend; directory entries live until cleared.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: Option<u64>,

    /// Root directory of the directory cache adapter.
    ///
    /// Set via QUIRE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Path to the SQLite file of the durable client store.
    ///
    /// Set via QUIRE_CLIENT_STORE_PATH environment variable.
    #[serde(default = "default_client_store_path")]
    pub client_store_path: PathBuf,

    /// User-Agent string for origin requests.
    ///
    /// Set via QUIRE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds.
    ///
    /// Set via QUIRE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of uncached items fetched concurrently per sync batch.
    ///
    /// Set via QUIRE_BATCH_SIZE environment variable.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum attempts per origin call, including the first.
    ///
    /// Set via QUIRE_RETRY_MAX_ATTEMPTS environment variable.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Delay before the first retry in milliseconds; doubles per attempt.
    ///
    /// Set via QUIRE_RETRY_BASE_DELAY_MS environment variable.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Hover time before a prefetch fires, in milliseconds.
    ///
    /// Set via QUIRE_PREFETCH_DELAY_MS environment variable.
    #[serde(default = "default_prefetch_delay_ms")]
    pub prefetch_delay_ms: u64,

    /// Optional TOML file overriding the built-in cleaner rules.
    ///
    /// Set via QUIRE_CLEAN_RULES_FILE environment variable.
    #[serde(default)]
    pub clean_rules_file: Option<PathBuf>,
}

fn default_origin_url() -> String {
    "https://lms.example.edu".into()
}

fn default_cache_ttl_secs() -> Option<u64> {
    Some(3600)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./quire-cache")
}

fn default_client_store_path() -> PathBuf {
    PathBuf::from("./quire-client.sqlite")
}

fn default_user_agent() -> String {
    "quire/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_batch_size() -> usize {
    4
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_prefetch_delay_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin_url: default_origin_url(),
            lms_token: None,
            cache_backend: CacheBackend::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_dir: default_cache_dir(),
            client_store_path: default_client_store_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            batch_size: default_batch_size(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            prefetch_delay_ms: default_prefetch_delay_ms(),
            clean_rules_file: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn prefetch_delay(&self) -> Duration {
        Duration::from_millis(self.prefetch_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `QUIRE_`
    /// 2. TOML file from `QUIRE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("QUIRE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("QUIRE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the LMS token is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the LMS token is not set.
    pub fn require_lms_token(&self) -> Result<&str, ConfigError> {
        self.lms_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "lms_token".into(),
                hint: "Set QUIRE_LMS_TOKEN environment variable".into(),
            })
    }
}
