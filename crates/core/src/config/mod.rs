//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SW_CACHE_*)
//! 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Configuration is read once at startup; the worker never reloads it.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{ExpiryMode, ExpiryPolicy, PartitionSet};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SW_CACHE_*)
/// 2. TOML config file (if SW_CACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SW_CACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the static asset paths are resolved against.
    ///
    /// Set via SW_CACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SW_CACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SW_CACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds, applied to every fetch.
    ///
    /// Set via SW_CACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Version suffix of every partition name.
    ///
    /// Set via SW_CACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths fetched into the static partition on install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Web app manifest path, always classified as static.
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Page served to navigations when both network and cache miss.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Path regexes that classify a request as an API call.
    #[serde(default = "default_api_patterns")]
    pub api_patterns: Vec<String>,

    /// Hostname substring that classifies a request as an API call.
    ///
    /// Set via SW_CACHE_BACKEND_HOST environment variable.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    #[serde(default = "default_static_max_age_secs")]
    pub static_max_age_secs: u64,

    #[serde(default = "default_api_max_age_secs")]
    pub api_max_age_secs: u64,

    #[serde(default = "default_dynamic_max_age_secs")]
    pub dynamic_max_age_secs: u64,

    /// `uniform` (api max-age everywhere) or `per_partition`.
    ///
    /// Set via SW_CACHE_EXPIRY_MODE environment variable.
    #[serde(default)]
    pub expiry_mode: ExpiryMode,

    /// Interval between background expiry sweeps.
    ///
    /// Set via SW_CACHE_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_user_agent() -> String {
    "sw-cache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_static_assets() -> Vec<String> {
    vec!["/".into(), "/manifest.json".into(), "/offline.html".into(), "/favicon.ico".into()]
}

fn default_manifest_path() -> String {
    "/manifest.json".into()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_api_patterns() -> Vec<String> {
    vec![
        "^/rest/v1/".into(),
        "^/auth/v1/".into(),
        "^/storage/v1/".into(),
        "^/functions/v1/".into(),
        "^/api/".into(),
    ]
}

fn default_backend_host() -> String {
    "supabase.co".into()
}

fn default_static_max_age_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_api_max_age_secs() -> u64 {
    5 * 60
}

fn default_dynamic_max_age_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    6 * 60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            manifest_path: default_manifest_path(),
            offline_page: default_offline_page(),
            api_patterns: default_api_patterns(),
            backend_host: default_backend_host(),
            static_max_age_secs: default_static_max_age_secs(),
            api_max_age_secs: default_api_max_age_secs(),
            dynamic_max_age_secs: default_dynamic_max_age_secs(),
            expiry_mode: ExpiryMode::Uniform,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Partition names for the configured cache version.
    pub fn partitions(&self) -> PartitionSet {
        PartitionSet::new(&self.cache_version)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            mode: self.expiry_mode,
            static_max_age: Duration::from_secs(self.static_max_age_secs),
            api_max_age: Duration::from_secs(self.api_max_age_secs),
            dynamic_max_age: Duration::from_secs(self.dynamic_max_age_secs),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SW_CACHE_`
    /// 2. TOML file from `SW_CACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SW_CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SW_CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
