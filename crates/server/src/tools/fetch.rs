//! sw_fetch tool implementation.
//!
//! Routes a request through the worker, or straight to the network when the
//! worker passes it through.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{FetchOutcome, Worker};
use swcache_core::{Error, Request, Response};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation, which gets the offline page
    /// instead of a bare 503 when nothing can answer.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    /// Request class, absent for passthrough requests.
    pub class: Option<String>,
    /// Strategy used, absent for passthrough requests.
    pub strategy: Option<String>,
    /// Where the response came from: "network", "cache", "offline" or "passthrough".
    pub source: String,
}

impl SwFetchOutput {
    fn new(url: &str, response: &Response) -> Self {
        Self {
            url: url.to_string(),
            status: response.status,
            headers: response.headers.iter().cloned().collect(),
            body: response.body_text().into_owned(),
            class: None,
            strategy: None,
            source: "passthrough".into(),
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut request = Request::parse(&params.method, &params.url)?;
    if params.navigate {
        request = request.navigate();
    }

    let output = match worker.handle_fetch(&request).await {
        FetchOutcome::Handled { class, strategy, served } => {
            let mut output = SwFetchOutput::new(&params.url, &served.response);
            output.class = Some(class.to_string());
            output.strategy = Some(to_label(&strategy));
            output.source = to_label(&served.source);
            output
        }
        FetchOutcome::Passthrough => {
            tracing::debug!("passing {} {} through", request.method, request.url);
            let response = worker.fetch_direct(&request).await?;
            SwFetchOutput::new(&params.url, &response)
        }
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Serialized name of a unit enum variant.
fn to_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
