//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the key of a request within a partition.
///
/// Only the method and URL participate; request headers are ignored.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
