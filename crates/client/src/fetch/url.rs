//! Static asset resolution against the app origin.

/// Error type for asset resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a configured static asset path against the app origin.
///
/// Only http(s) origins are accepted; absolute asset URLs are kept as-is.
pub fn resolve_asset(origin: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    match origin.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let path = path.trim();
    if path.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = origin.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}
