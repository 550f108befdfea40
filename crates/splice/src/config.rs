// File: src/config.rs
// Purpose: Router configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs for the navigation engine. Loaded from whatever the embedding
/// application uses for configuration; the core only consumes the struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Default request timeout, passed through to the HTTP client. Expiry
    /// surfaces as a generic exception, never a retry.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Render a diagnostic overlay with the raw server body when a response
    /// turns out to be non-hybrid (development-time debugging).
    #[serde(default = "default_error_overlay")]
    pub error_overlay: bool,
}

fn default_error_overlay() -> bool {
    true
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: None,
            error_overlay: true,
        }
    }
}

impl RouterConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
