//! Control message protocol between the page and the worker.
//!
//! Messages are JSON objects with a `type` field. Only `GET_VERSION`
//! produces a reply, posted on the port supplied with the message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    GetVersion,
    CleanCache,
}

impl ControlMessage {
    /// Parse a raw message. Unknown or malformed messages yield `None`.
    pub fn parse(raw: &Value) -> Option<Self> {
        serde_json::from_value(raw.clone()).ok()
    }
}

/// Reply to `GET_VERSION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
    pub version: String,
}

/// Reply channel handed to the worker alongside a message.
#[derive(Debug, Clone)]
pub struct MessagePort {
    tx: mpsc::UnboundedSender<Value>,
}

impl MessagePort {
    /// Create a port and the receiving end the page listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post a reply. Returns false if the page side is gone.
    pub fn post<T: Serialize>(&self, message: &T) -> bool {
        match serde_json::to_value(message) {
            Ok(value) => self.tx.send(value).is_ok(),
            Err(e) => {
                tracing::warn!("failed to encode port message: {}", e);
                false
            }
        }
    }
}
