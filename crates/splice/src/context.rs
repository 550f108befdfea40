// File: src/context.rs
// Purpose: The single router context record and its controlled mutation surface

use std::sync::{Arc, RwLock};

use futures::future::AbortHandle;
use serde::{Deserialize, Serialize};
use splice_protocol::Properties;
use thiserror::Error;
use url::Url;

use crate::adapter::Adapter;

/// Mounted base view: component identifier plus its property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub component: String,

    #[serde(default)]
    pub properties: Properties,
}

/// Overlay view navigable independently of the base view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub component: String,

    #[serde(default)]
    pub properties: Properties,

    /// URL of the page the dialog is layered over.
    pub base_url: Url,

    /// Where to go when the dialog closes.
    pub redirect_url: Option<Url>,

    /// Identity of this dialog instance; a new key remounts the component.
    pub key: Option<String>,
}

/// One scroll position captured per visit, restored on back/forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollRegion {
    pub top: f64,
    pub left: f64,
}

/// Cancellation handle for the in-flight navigation. Cloning shares the
/// underlying abort registration. The id lets a settling visit tell whether
/// the active handle is still its own before clearing it.
#[derive(Debug, Clone)]
pub struct VisitHandle {
    pub id: u64,
    pub url: Url,
    abort: AbortHandle,
}

impl VisitHandle {
    pub fn new(id: u64, url: Url, abort: AbortHandle) -> Self {
        Self { id, url, abort }
    }

    /// Abort the in-flight request. A response that already settled stays in
    /// the sequencer and is still processed.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

/// The process-wide navigation state. Owned by the router; every other
/// component reads snapshots and writes through [`ContextStore::set`].
#[derive(Debug, Clone)]
pub struct RouterContext {
    /// Normalized absolute URL, never relative.
    pub url: Url,
    pub view: View,
    pub dialog: Option<Dialog>,
    pub version: String,
    pub scroll_regions: Vec<ScrollRegion>,
    /// Free-form bag for adapter and plugin extensions.
    pub state: Properties,
    pub active_visit: Option<VisitHandle>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("router context accessed before initialization")]
    Uninitialized,
}

/// Shallow-merge patch for the context. Unset fields keep their value;
/// `dialog` and `active_visit` distinguish "leave alone" from "clear".
#[derive(Debug, Default)]
pub struct ContextPatch {
    pub url: Option<Url>,
    pub view: Option<View>,
    pub dialog: Option<Option<Dialog>>,
    pub version: Option<String>,
    pub scroll_regions: Option<Vec<ScrollRegion>>,
    pub state: Option<Properties>,
    pub active_visit: Option<Option<VisitHandle>>,
}

impl ContextPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    pub fn dialog(mut self, dialog: Option<Dialog>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn scroll_regions(mut self, regions: Vec<ScrollRegion>) -> Self {
        self.scroll_regions = Some(regions);
        self
    }

    pub fn state(mut self, state: Properties) -> Self {
        self.state = Some(state);
        self
    }

    pub fn active_visit(mut self, visit: Option<VisitHandle>) -> Self {
        self.active_visit = Some(visit);
        self
    }
}

/// Holder of the single [`RouterContext`] plus the adapter binding that
/// reacts to updates. `get` hands out snapshots; `set` is the only mutation
/// surface.
pub struct ContextStore {
    context: RwLock<Option<RouterContext>>,
    adapter: RwLock<Option<Arc<dyn Adapter>>>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self {
            context: RwLock::new(None),
            adapter: RwLock::new(None),
        }
    }

    /// Install the context and adapter. Calling again replaces both.
    pub fn initialize(&self, context: RouterContext, adapter: Arc<dyn Adapter>) {
        *self.context.write().expect("context lock poisoned") = Some(context);
        *self.adapter.write().expect("adapter lock poisoned") = Some(adapter);
    }

    /// Snapshot of the current context. Fails before initialization.
    pub fn get(&self) -> Result<RouterContext, StoreError> {
        self.context
            .read()
            .expect("context lock poisoned")
            .clone()
            .ok_or(StoreError::Uninitialized)
    }

    pub fn adapter(&self) -> Result<Arc<dyn Adapter>, StoreError> {
        self.adapter
            .read()
            .expect("adapter lock poisoned")
            .clone()
            .ok_or(StoreError::Uninitialized)
    }

    /// Shallow-merge the patch into the context. Unless `propagate` is false,
    /// the adapter's update callback observes the new context synchronously.
    pub fn set(&self, patch: ContextPatch, propagate: bool) -> Result<RouterContext, StoreError> {
        let updated = {
            let mut guard = self.context.write().expect("context lock poisoned");
            let context = guard.as_mut().ok_or(StoreError::Uninitialized)?;

            if let Some(url) = patch.url {
                context.url = url;
            }
            if let Some(view) = patch.view {
                context.view = view;
            }
            if let Some(dialog) = patch.dialog {
                context.dialog = dialog;
            }
            if let Some(version) = patch.version {
                context.version = version;
            }
            if let Some(regions) = patch.scroll_regions {
                context.scroll_regions = regions;
            }
            if let Some(state) = patch.state {
                context.state = state;
            }
            if let Some(visit) = patch.active_visit {
                context.active_visit = visit;
            }

            context.clone()
        };

        if propagate {
            if let Ok(adapter) = self.adapter() {
                adapter.on_context_update(&updated);
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ResolvedComponent;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingAdapter {
        updates: AtomicUsize,
    }

    #[async_trait]
    impl Adapter for RecordingAdapter {
        async fn resolve(&self, component: &str) -> anyhow::Result<ResolvedComponent> {
            Ok(Box::new(component.to_string()))
        }

        async fn swap_view(
            &self,
            _component: ResolvedComponent,
            _view: &View,
            _preserve_state: bool,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn swap_dialog(
            &self,
            _component: ResolvedComponent,
            _dialog: &Dialog,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn close_dialog(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn on_context_update(&self, _context: &RouterContext) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn context() -> RouterContext {
        RouterContext {
            url: Url::parse("https://example.com/").unwrap(),
            view: View {
                component: "home".to_string(),
                properties: Properties::new(),
            },
            dialog: None,
            version: "1".to_string(),
            scroll_regions: Vec::new(),
            state: Properties::new(),
            active_visit: None,
        }
    }

    #[test]
    fn get_before_initialize_fails() {
        let store = ContextStore::new();
        assert_eq!(store.get().unwrap_err(), StoreError::Uninitialized);
    }

    #[test]
    fn set_merges_and_propagates() {
        let store = ContextStore::new();
        let adapter = Arc::new(RecordingAdapter {
            updates: AtomicUsize::new(0),
        });
        store.initialize(context(), Arc::clone(&adapter) as Arc<dyn Adapter>);

        let updated = store
            .set(
                ContextPatch::new().version("2").url(Url::parse("https://example.com/a").unwrap()),
                true,
            )
            .unwrap();

        assert_eq!(updated.version, "2");
        assert_eq!(updated.view.component, "home");
        assert_eq!(adapter.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn propagate_false_skips_adapter() {
        let store = ContextStore::new();
        let adapter = Arc::new(RecordingAdapter {
            updates: AtomicUsize::new(0),
        });
        store.initialize(context(), Arc::clone(&adapter) as Arc<dyn Adapter>);

        store.set(ContextPatch::new().version("2"), false).unwrap();
        assert_eq!(adapter.updates.load(Ordering::SeqCst), 0);
    }
}
