//! Core types and shared functionality for sw-cache.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response model shared by the worker and the server
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheStorage, CachedEntry, ExpiryMode, ExpiryPolicy, PartitionSet, RequestClass};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{CACHED_AT_HEADER, Request, RequestMode, Response};
