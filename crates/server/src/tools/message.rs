//! sw_message tool implementation.
//!
//! Delivers a control message to the worker with a fresh reply port and
//! returns whatever was posted on it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_client::{MessagePort, Worker};
use swcache_core::Error;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object with a `type` field: SKIP_WAITING, GET_VERSION or CLEAN_CACHE.
    pub message: Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Reply posted on the port, if any.
    pub reply: Option<Value>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let (port, mut rx) = MessagePort::channel();
    worker.handle_message(&params.message, Some(&port)).await;
    drop(port);

    let output = SwMessageOutput { reply: rx.try_recv().ok() };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
