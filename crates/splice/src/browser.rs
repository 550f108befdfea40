// File: src/browser.rs
// Purpose: Browser environment driver - history slot, location, scroll, hand-offs

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::context::ScrollRegion;
use crate::request::RawResponse;

/// Everything the engine needs from the hosting browser (or a test double):
/// the history slot, the current location, scroll control, and the two
/// hand-offs that leave the hybrid protocol entirely.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Current location, used as the base for relative visit targets and for
    /// the same-URL replace detection.
    fn location(&self) -> Url;

    /// Push a new history entry carrying the serialized context.
    async fn push_state(&self, url: &Url, state: Value) -> anyhow::Result<()>;

    /// Replace the current history entry.
    async fn replace_state(&self, url: &Url, state: Value) -> anyhow::Result<()>;

    /// Read back the current history slot, if any.
    fn history_state(&self) -> Option<Value>;

    /// Capture the current scroll positions of all tracked regions.
    fn capture_scroll(&self) -> Vec<ScrollRegion>;

    fn restore_scroll(&self, regions: &[ScrollRegion]);

    fn scroll_to_top(&self);

    /// Full browser navigation, bypassing the hybrid protocol.
    fn load_external(&self, url: &Url);

    /// Hand a file-download response to the browser.
    fn download(&self, response: &RawResponse);

    /// Development-time diagnostic overlay for non-hybrid responses. Default
    /// is a no-op; real drivers may render the raw server body.
    fn show_error_overlay(&self, _response: &RawResponse) {}
}
