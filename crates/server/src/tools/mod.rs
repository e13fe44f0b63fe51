//! MCP tool implementations.
//!
//! This module contains all tools exposed by the sw-cache server.

pub mod fetch;
pub mod message;
pub mod stats;

pub use fetch::SwFetchParams;
pub use message::SwMessageParams;
