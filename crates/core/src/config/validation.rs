//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin_url` is not an http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `batch_size` is 0 or exceeds 64
    /// - `retry_max_attempts` is 0 or exceeds 10
    /// - `cache_ttl_secs` is 0 or exceeds 7 days
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "origin_url".into(),
                    reason: format!("unsupported scheme: {}", url.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin_url".into(), reason: e.to_string() }),
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.batch_size == 0 || self.batch_size > 64 {
            return Err(ConfigError::Invalid { field: "batch_size".into(), reason: "must be between 1 and 64".into() });
        }

        if self.retry_max_attempts == 0 || self.retry_max_attempts > 10 {
            return Err(ConfigError::Invalid {
                field: "retry_max_attempts".into(),
                reason: "must be between 1 and 10".into(),
            });
        }

        if let Some(ttl) = self.cache_ttl_secs
            && (ttl == 0 || ttl > 604_800)
        {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be between 1 second and 7 days (604800s)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.lms_token.is_none() {
            tracing::warn!("lms_token is not set; only cached content will be served");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_url_garbage() {
        let config = AppConfig { origin_url: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin_url"));
    }

    #[test]
    fn test_validate_origin_url_scheme() {
        let config = AppConfig { origin_url: "ftp://lms.example.edu".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin_url"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_batch_size_bounds() {
        let zero = AppConfig { batch_size: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid { field, .. }) if field == "batch_size"));

        let huge = AppConfig { batch_size: 65, ..Default::default() };
        assert!(matches!(huge.validate(), Err(ConfigError::Invalid { field, .. }) if field == "batch_size"));
    }

    #[test]
    fn test_validate_retry_attempts_zero() {
        let config = AppConfig { retry_max_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "retry_max_attempts"));
    }

    #[test]
    fn test_validate_cache_ttl_bounds() {
        let zero = AppConfig { cache_ttl_secs: Some(0), ..Default::default() };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));

        let long = AppConfig { cache_ttl_secs: Some(604_801), ..Default::default() };
        assert!(matches!(long.validate(), Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));

        let unbounded = AppConfig { cache_ttl_secs: None, ..Default::default() };
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, batch_size: 1, retry_max_attempts: 1, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { timeout_ms: 300_000, batch_size: 64, retry_max_attempts: 10, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
