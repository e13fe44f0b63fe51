//! Expiry policy for stored responses.
//!
//! Three max-ages are configured (static, api, dynamic), but in `Uniform`
//! mode only the api max-age is consulted, for every partition. That is the
//! historical behavior of this cache and remains the default;
//! `PerPartition` applies each class's own max-age and stamps every write
//! so that static and dynamic entries can actually expire.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::partitions::RequestClass;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryMode {
    /// Apply the api max-age everywhere. Only network-first writes are stamped.
    #[default]
    Uniform,
    /// Apply each partition's own max-age. Every write is stamped.
    PerPartition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub mode: ExpiryMode,
    pub static_max_age: Duration,
    pub api_max_age: Duration,
    pub dynamic_max_age: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            mode: ExpiryMode::Uniform,
            static_max_age: Duration::from_secs(30 * 24 * 60 * 60),
            api_max_age: Duration::from_secs(5 * 60),
            dynamic_max_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ExpiryPolicy {
    /// Max-age applied to entries of the given partition.
    ///
    /// `None` (an unknown partition) falls back to the api max-age.
    pub fn max_age(&self, class: Option<RequestClass>) -> Duration {
        match (self.mode, class) {
            (ExpiryMode::PerPartition, Some(RequestClass::Static)) => self.static_max_age,
            (ExpiryMode::PerPartition, Some(RequestClass::Dynamic)) => self.dynamic_max_age,
            _ => self.api_max_age,
        }
    }

    /// Whether writes into the given partition get a timestamp header.
    pub fn stamps(&self, class: RequestClass) -> bool {
        class == RequestClass::Api || self.mode == ExpiryMode::PerPartition
    }
}
