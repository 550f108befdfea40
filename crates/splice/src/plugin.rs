// File: src/plugin.rs
// Purpose: Third-party extension surface

use async_trait::async_trait;

use crate::context::RouterContext;
use crate::dispatch::{Hook, HookPayload};
use crate::hooks::HookResult;

/// A registered extension. Plugins observe every named hook after the
/// per-request and global sources, in registration order, and may veto
/// cancellable hooks like any other source.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once when the plugin is attached to an initialized router.
    fn initialized(&self, _context: &RouterContext) {}

    /// Partial hook map: ignore kinds you do not care about.
    async fn on_hook(&self, _hook: Hook, _payload: HookPayload) -> anyhow::Result<HookResult> {
        Ok(HookResult::Continue)
    }
}
