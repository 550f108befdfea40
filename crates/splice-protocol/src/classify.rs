// File: src/classify.rs
// Purpose: Decide what kind of response a completed hybrid exchange carries

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::HeaderMap;

use crate::headers;

/// What a completed response turned out to be, decided from headers alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// Hybrid JSON payload (marker header + JSON content type).
    Hybrid,

    /// The server wants a full browser navigation to this URL.
    External(String),

    /// File download; hand off to the browser, no context change.
    Download,

    /// Anything else: stock HTML, proxy error page, misconfigured endpoint.
    NonHybrid,
}

/// Classify a response by its headers. Branch order matters: an explicit
/// external-navigation instruction wins over everything, a download wins over
/// the marker check.
pub fn classify(headers: &HeaderMap) -> ResponseKind {
    if let Some(location) = header_str(headers, headers::EXTERNAL) {
        return ResponseKind::External(location.to_string());
    }

    if is_download(headers) {
        return ResponseKind::Download;
    }

    let has_marker = headers.contains_key(headers::MARKER);
    if has_marker && is_json(headers) {
        return ResponseKind::Hybrid;
    }

    ResponseKind::NonHybrid
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE.as_str())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

fn is_download(headers: &HeaderMap) -> bool {
    if let Some(disposition) = header_str(headers, CONTENT_DISPOSITION.as_str()) {
        if disposition.trim_start().starts_with("attachment") {
            return true;
        }
    }

    header_str(headers, CONTENT_TYPE.as_str())
        .map(|ct| ct.starts_with("application/octet-stream"))
        .unwrap_or(false)
}
