//! cache_stats tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Worker;
use swcache_core::Error;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    /// False for partitions left over from another cache version.
    pub current: bool,
}

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub version: String,
    /// Lifecycle state of the worker.
    pub state: String,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let partitions = worker
        .stats()
        .await?
        .into_iter()
        .map(|p| PartitionSummary { name: p.name, entries: p.entries, current: p.current })
        .collect();

    let state = serde_json::to_value(worker.state().await)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let output = CacheStatsOutput { version: worker.version(), state, partitions };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize stats: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
