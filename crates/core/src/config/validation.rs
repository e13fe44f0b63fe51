//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::cache::ExpiryMode;
use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound for max-ages and the sweep interval (365 days).
const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_version` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - any `api_patterns` entry is not a valid regex
    /// - a max-age or the sweep interval is zero or longer than a year
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
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

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        for pattern in &self.api_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ConfigError::Invalid {
                    field: "api_patterns".into(),
                    reason: format!("{pattern}: {e}"),
                });
            }
        }

        for (field, value) in [
            ("static_max_age_secs", self.static_max_age_secs),
            ("api_max_age_secs", self.api_max_age_secs),
            ("dynamic_max_age_secs", self.dynamic_max_age_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
            if value > MAX_PERIOD_SECS {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("must not exceed one year ({MAX_PERIOD_SECS}s)"),
                });
            }
        }

        if self.expiry_mode == ExpiryMode::Uniform
            && (self.static_max_age_secs != self.api_max_age_secs
                || self.dynamic_max_age_secs != self.api_max_age_secs)
        {
            tracing::warn!(
                api_max_age_secs = self.api_max_age_secs,
                static_max_age_secs = self.static_max_age_secs,
                dynamic_max_age_secs = self.dynamic_max_age_secs,
                "expiry_mode is uniform; static and dynamic max-ages are ignored \
                 and the api max-age applies to every partition"
            );
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
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_cache_version() {
        let config = AppConfig { cache_version: " ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_origin() {
        let relative = AppConfig { origin: "localhost".into(), ..Default::default() };
        assert!(matches!(relative.validate(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));

        let ftp = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(ftp.validate(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_bad_api_pattern() {
        let config = AppConfig { api_patterns: vec!["^/rest/(v1".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_patterns"));
    }

    #[test]
    fn test_validate_zero_sweep_interval() {
        let config = AppConfig { sweep_interval_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sweep_interval_secs"));
    }

    #[test]
    fn test_validate_sweep_interval_upper_bound() {
        let config = AppConfig { sweep_interval_secs: u64::MAX, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sweep_interval_secs"));

        let config = AppConfig { sweep_interval_secs: MAX_PERIOD_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_age_upper_bound() {
        let config = AppConfig { static_max_age_secs: MAX_PERIOD_SECS + 1, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "static_max_age_secs"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());
    }
}
