// File: src/request.rs
// Purpose: Hybrid request construction, sending, and the settled raw response

use std::time::Duration;

use anyhow::{Context, Result};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use splice_protocol::{headers, partial, PartialFields};
use url::Url;

use crate::dispatch::RequestHooks;

/// Caller-supplied options for one visit.
#[derive(Debug, Clone, Default)]
pub struct VisitOptions {
    pub method: Method,

    /// JSON request body for non-GET visits.
    pub body: Option<Value>,

    /// Partial-reload field selection (`only`/`except` dot-paths).
    pub partial: PartialFields,

    /// Validation error bag the caller is interested in.
    pub error_bag: Option<String>,

    /// Extra request headers.
    pub headers: Vec<(String, String)>,

    pub preserve_scroll: bool,
    pub preserve_state: bool,
    pub preserve_url: bool,
    pub replace: bool,

    /// Pass-through request timeout; surfaced as a generic exception on expiry.
    pub timeout: Option<Duration>,

    /// Ad hoc hooks for this request only.
    pub hooks: RequestHooks,
}

impl VisitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn partial(mut self, partial: PartialFields) -> Self {
        self.partial = partial;
        self
    }

    pub fn error_bag(mut self, bag: impl Into<String>) -> Self {
        self.error_bag = Some(bag.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn preserve_scroll(mut self, preserve: bool) -> Self {
        self.preserve_scroll = preserve;
        self
    }

    pub fn preserve_state(mut self, preserve: bool) -> Self {
        self.preserve_state = preserve;
        self
    }

    pub fn preserve_url(mut self, preserve: bool) -> Self {
        self.preserve_url = preserve;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn hooks(mut self, hooks: RequestHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

/// A visit target plus its options; what the response handler needs to know
/// about the originating request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub options: VisitOptions,
}

impl RequestDescriptor {
    pub fn intent(&self) -> VisitIntent {
        VisitIntent {
            url: self.url.clone(),
            method: self.options.method.clone(),
            partial: self.options.partial.clone(),
            replace: self.options.replace,
        }
    }
}

/// Hook-facing summary of a visit.
#[derive(Debug, Clone)]
pub struct VisitIntent {
    pub url: Url,
    pub method: Method,
    pub partial: PartialFields,
    pub replace: bool,
}

/// Body download progress, emitted per received chunk.
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

/// A fully materialized HTTP response: status, headers, body bytes, and the
/// final URL after server-side redirects.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub url: Url,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .with_context(|| format!("response from {} is not valid JSON", self.url))
    }
}

/// Send one hybrid request and stream the body down, reporting progress per
/// chunk. Cancellation is the caller's concern (the whole future is wrapped
/// in an abortable at the visit layer).
pub(crate) async fn send<F, Fut>(
    client: &reqwest::Client,
    descriptor: &RequestDescriptor,
    version: &str,
    progress: F,
) -> Result<RawResponse>
where
    F: Fn(TransferProgress) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let options = &descriptor.options;

    let mut request = client
        .request(options.method.clone(), descriptor.url.clone())
        .header(headers::MARKER, "true")
        .header(headers::VERSION, version)
        .header(http::header::ACCEPT, "application/json");

    if !options.partial.only.is_empty() {
        request = request.header(headers::ONLY, partial::encode_paths(&options.partial.only));
    }
    if !options.partial.except.is_empty() {
        request = request.header(headers::EXCEPT, partial::encode_paths(&options.partial.except));
    }
    if let Some(bag) = &options.error_bag {
        request = request.header(headers::ERROR_BAG, bag);
    }
    for (name, value) in &options.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }
    if let Some(body) = &options.body {
        request = request.json(body);
    }

    let mut response = request
        .send()
        .await
        .with_context(|| format!("request to {} failed", descriptor.url))?;

    let status = response.status();
    let headers = response.headers().clone();
    let url = response.url().clone();
    let total = response.content_length();

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("reading body from {} failed", descriptor.url))?
    {
        body.extend_from_slice(&chunk);
        progress(TransferProgress {
            loaded: body.len() as u64,
            total,
        })
        .await?;
    }

    tracing::debug!(%url, %status, bytes = body.len(), "hybrid response settled");

    Ok(RawResponse {
        status,
        headers,
        body,
        url,
    })
}
