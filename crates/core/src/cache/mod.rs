//! SQLite-backed partitioned response cache.
//!
//! This module provides named, versioned partitions of request→response
//! pairs, persisted with async access via tokio-rusqlite. It supports:
//!
//! - Content-addressed entry keys (SHA-256 of method + URL)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Lazy partition creation and cascading partition deletion
//! - Timestamp-based expiry with a configurable per-partition policy

pub mod connection;
pub mod entries;
pub mod expiry;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::CachedEntry;
pub use expiry::{ExpiryMode, ExpiryPolicy};
pub use partitions::{PartitionSet, RequestClass};
