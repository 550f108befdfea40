// File: src/adapter.rs
// Purpose: UI-framework binding consumed by the navigation engine

use std::any::Any;

use async_trait::async_trait;

use crate::context::{Dialog, RouterContext, View};

/// Opaque handle produced by [`Adapter::resolve`] and consumed by the swap
/// calls. The core never looks inside it.
pub type ResolvedComponent = Box<dyn Any + Send>;

/// Capability set the rendering layer injects at initialization. Resolution
/// may be asynchronous (lazy-loaded components); swaps are awaited before the
/// history write.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Resolve a component identifier to a mountable handle.
    async fn resolve(&self, component: &str) -> anyhow::Result<ResolvedComponent>;

    /// Swap the mounted base view. `preserve_state` asks the adapter to keep
    /// component-local state across the swap; the core only forwards it.
    async fn swap_view(
        &self,
        component: ResolvedComponent,
        view: &View,
        preserve_state: bool,
    ) -> anyhow::Result<()>;

    /// Mount or replace the overlay view.
    async fn swap_dialog(&self, component: ResolvedComponent, dialog: &Dialog) -> anyhow::Result<()>;

    /// Unmount the overlay view.
    async fn close_dialog(&self) -> anyhow::Result<()>;

    /// Observe a context update, synchronously, right after every
    /// propagating [`crate::context::ContextStore::set`].
    fn on_context_update(&self, context: &RouterContext);
}
