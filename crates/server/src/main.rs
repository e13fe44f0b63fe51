//! sw-cache server entry point.
//!
//! This is the main binary that boots the cache worker and serves it as an
//! MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpNetwork, Worker};
use swcache_core::{AppConfig, CacheStorage};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        version = %config.cache_version,
        "Starting sw-cache server on stdio transport"
    );

    let storage = CacheStorage::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let worker = Arc::new(Worker::new(&config, storage, Arc::new(network))?);
    worker.start().await?;

    let handler = handler::SwCacheServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    let quit = server.waiting().await;
    worker.terminate().await;
    quit?;

    Ok(())
}
