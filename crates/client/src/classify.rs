//! Request classification.
//!
//! Maps a URL to exactly one [`RequestClass`]. First match wins:
//!
//! 1. `Static`: path ends in a static-file extension, or is exactly `/`, or
//!    exactly the manifest path.
//! 2. `Api`: path matches one of the API route patterns, or the host
//!    contains the backend host substring.
//! 3. `Dynamic`: everything else.

use regex::Regex;
use swcache_core::{AppConfig, Error, RequestClass};
use url::Url;

/// Extensions of immutable build artifacts.
pub const STATIC_EXTENSIONS: &[&str] =
    &[".js", ".css", ".png", ".jpg", ".jpeg", ".svg", ".gif", ".ico", ".woff", ".woff2", ".ttf"];

/// Stateless URL classifier. Patterns are compiled once.
#[derive(Debug, Clone)]
pub struct Classifier {
    manifest_path: String,
    api_patterns: Vec<Regex>,
    backend_host: String,
}

impl Classifier {
    pub fn new(manifest_path: &str, api_patterns: &[String], backend_host: &str) -> Result<Self, Error> {
        let api_patterns = api_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("api pattern {p}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            manifest_path: manifest_path.to_string(),
            api_patterns,
            backend_host: backend_host.to_ascii_lowercase(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.manifest_path, &config.api_patterns, &config.backend_host)
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        let path = url.path();

        if self.is_static_path(path) {
            return RequestClass::Static;
        }

        if self.api_patterns.iter().any(|re| re.is_match(path)) {
            return RequestClass::Api;
        }

        if !self.backend_host.is_empty()
            && url
                .host_str()
                .is_some_and(|host| host.to_ascii_lowercase().contains(&self.backend_host))
        {
            return RequestClass::Api;
        }

        RequestClass::Dynamic
    }

    fn is_static_path(&self, path: &str) -> bool {
        if path == "/" || path == self.manifest_path {
            return true;
        }
        let lower = path.to_ascii_lowercase();
        STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}
