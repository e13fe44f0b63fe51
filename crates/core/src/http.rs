//! Request and response model for the cache worker.
//!
//! These are deliberately small: a request is identified by method and URL
//! only (headers never take part in cache matching), and a response is a
//! fully buffered status/headers/body triple that can be cloned freely.

use std::borrow::Cow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// Header injected into stored responses to record the write time
/// (milliseconds since the Unix epoch).
pub const CACHED_AT_HEADER: &str = "sw-cached-at";

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    /// Build a GET request for an already-parsed URL.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Cors }
    }

    /// Parse a method and URL string into a request.
    ///
    /// The method is upper-cased; the URL must be absolute.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let method = method.trim();
        if method.is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self { method: method.to_ascii_uppercase(), url, mode: RequestMode::Cors })
    }

    /// Mark this request as a navigation.
    pub fn navigate(mut self) -> Self {
        self.mode = RequestMode::Navigate;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the URL uses a scheme the worker intercepts.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// URL used for cache matching: the fragment never participates.
    pub fn key_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// Content-addressed key for this request within a partition.
    pub fn cache_key(&self) -> String {
        compute_request_key(&self.method.to_ascii_uppercase(), &self.key_url())
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Final URL the response was served from, when known.
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into(), url: None }
    }

    /// Synthetic response returned when neither network nor cache can answer.
    pub fn offline() -> Self {
        Self::new(503, "Offline").with_header("content-type", "text/plain")
    }

    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of `name` with a single `value`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Copy of this response annotated with the write timestamp.
    pub fn stamped(&self, now: DateTime<Utc>) -> Self {
        self.clone().with_header(CACHED_AT_HEADER, now.timestamp_millis().to_string())
    }

    /// Write timestamp in epoch milliseconds, if the response carries one.
    pub fn cached_at(&self) -> Option<i64> {
        self.header(CACHED_AT_HEADER).and_then(|v| v.trim().parse().ok())
    }

    /// An entry is expired only if it carries a write timestamp older than
    /// `max_age`. Unstamped entries never expire.
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.cached_at() {
            Some(stamp) => {
                let age_ms = now.timestamp_millis().saturating_sub(stamp);
                age_ms > i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX)
            }
            None => false,
        }
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
