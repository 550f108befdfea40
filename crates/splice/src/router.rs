// File: src/router.rs
// Purpose: Public navigation entry points and visit lifecycle orchestration

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use anyhow::{anyhow, Context, Result};
use futures::future::{AbortHandle, Abortable};
use serde_json::Value;
use splice_protocol::{Properties, VisitPayload};
use tokio::sync::oneshot;

use crate::adapter::Adapter;
use crate::browser::BrowserDriver;
use crate::config::RouterConfig;
use crate::context::{ContextPatch, ContextStore, RouterContext, StoreError, VisitHandle, View};
use crate::dispatch::{self, Hook, HookPayload, HookRegistrar, RequestHooks};
use crate::error::NavigationError;
use crate::history::{self, JsonSerializer, StateSerializer};
use crate::hooks::{callback, HookResult, ListenerHandle};
use crate::navigate::{
    dialog_from_payload, HistoryWrite, NavigationKind, NavigationOptions, NavigationTarget,
};
use crate::plugin::Plugin;
use crate::request::{self, RawResponse, RequestDescriptor, TransferProgress, VisitOptions};
use crate::sequencer::{ProcessFn, ResponseSequencer, SettledResponse};
use crate::url::make_url;

/// What a finished visit resolved to. Always a value, never a rejected
/// future: protocol-level failures live in `Failed`, and only bugs in the
/// caller's own hook callbacks surface as errors.
#[derive(Debug, Clone)]
pub enum VisitOutcome {
    Completed { response: RawResponse },
    Failed { error: Arc<NavigationError> },
}

impl VisitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, VisitOutcome::Completed { .. })
    }

    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            VisitOutcome::Completed { response } => Some(response),
            VisitOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&NavigationError> {
        match self {
            VisitOutcome::Completed { .. } => None,
            VisitOutcome::Failed { error } => Some(error),
        }
    }
}

/// Everything needed to bring a router up from the server-embedded initial
/// payload.
pub struct InitOptions {
    pub payload: VisitPayload,
    pub adapter: Arc<dyn Adapter>,
    pub browser: Arc<dyn BrowserDriver>,
    pub serializer: Option<Arc<dyn StateSerializer>>,
    pub config: RouterConfig,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

/// A navigation that never touches the network: change the URL, component,
/// or properties directly.
#[derive(Debug, Clone, Default)]
pub struct LocalVisit {
    pub url: Option<String>,
    pub component: Option<String>,
    pub properties: Option<Properties>,
    pub replace: bool,
    pub preserve_scroll: bool,
    pub preserve_state: bool,
}

pub(crate) struct RouterInner {
    pub(crate) store: ContextStore,
    pub(crate) hooks: HookRegistrar,
    pub(crate) plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    pub(crate) browser: Arc<dyn BrowserDriver>,
    pub(crate) serializer: Arc<dyn StateSerializer>,
    pub(crate) client: reqwest::Client,
    pub(crate) config: RouterConfig,
    pub(crate) sequencer: ResponseSequencer,
    visit_ids: AtomicU64,
}

impl RouterInner {
    /// Run one named hook through its three sources (request, global,
    /// plugins). Snapshot the plugin list first so no lock is held across an
    /// await point.
    pub(crate) async fn dispatch(
        &self,
        payload: HookPayload,
        request: &RequestHooks,
    ) -> Result<bool> {
        let plugins: Vec<Arc<dyn Plugin>> =
            { self.plugins.read().expect("plugins lock poisoned").clone() };
        dispatch::dispatch(payload, request, &self.hooks, &plugins).await
    }

    fn next_visit_id(&self) -> u64 {
        self.visit_ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop the active-visit handle, but only if it still belongs to the
    /// visit that is settling; a newer visit may have replaced it already.
    fn clear_active_visit(&self, id: u64) {
        if let Ok(context) = self.store.get() {
            if context.active_visit.as_ref().map(|visit| visit.id) == Some(id) {
                let _ = self.store.set(ContextPatch::new().active_visit(None), false);
            }
        }
    }
}

/// The navigation engine's facade. Cheap to clone; all clones share the one
/// router context.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Bring the router up from the server-embedded initial payload: install
    /// the context, mount the initial view through the adapter, and write
    /// the first history entry (exactly one push).
    pub async fn initialize(options: InitOptions) -> Result<Self> {
        let InitOptions {
            payload,
            adapter,
            browser,
            serializer,
            config,
            plugins,
        } = options;

        let inner = Arc::new_cyclic(|weak: &Weak<RouterInner>| {
            let process: ProcessFn = {
                let weak = weak.clone();
                Arc::new(move |request, response| {
                    let weak = weak.clone();
                    Box::pin(async move {
                        match weak.upgrade() {
                            Some(inner) => inner.process(request, response).await,
                            None => Ok(VisitOutcome::Failed {
                                error: Arc::new(NavigationError::Aborted),
                            }),
                        }
                    })
                })
            };

            RouterInner {
                store: ContextStore::new(),
                hooks: HookRegistrar::new(),
                plugins: RwLock::new(plugins),
                browser,
                serializer: serializer.unwrap_or_else(|| Arc::new(JsonSerializer)),
                client: reqwest::Client::new(),
                config,
                sequencer: ResponseSequencer::new(process),
                visit_ids: AtomicU64::new(0),
            }
        });

        let base = inner.browser.location();
        let url = make_url(&payload.url, &base)?;
        let component = payload
            .view
            .component
            .clone()
            .context("initial payload must name a view component")?;

        let context = RouterContext {
            url: url.clone(),
            view: View {
                component,
                properties: payload.view.properties.clone(),
            },
            dialog: None,
            version: payload.version.clone(),
            scroll_regions: Vec::new(),
            state: Properties::new(),
            active_visit: None,
        };
        inner.store.initialize(context, adapter);

        let snapshot = inner.store.get()?;
        for plugin in inner.plugins.read().expect("plugins lock poisoned").iter() {
            plugin.initialized(&snapshot);
        }

        let dialog = payload
            .dialog
            .as_ref()
            .map(|dialog| dialog_from_payload(dialog, &url))
            .transpose()
            .map_err(anyhow::Error::from)?;

        let details = inner
            .navigate(NavigationOptions {
                kind: NavigationKind::Local,
                url,
                target: NavigationTarget {
                    component: payload.view.component.clone(),
                    properties: payload.view.properties.clone(),
                    dialog,
                    version: payload.version.clone(),
                },
                properties_override: None,
                preserve_scroll: false,
                preserve_state: false,
                preserve_url: false,
                history: HistoryWrite::Push,
                fresh: true,
                scroll_regions: None,
            })
            .await
            .map_err(anyhow::Error::from)?;
        inner
            .dispatch(HookPayload::Navigate(details), &RequestHooks::default())
            .await?;

        tracing::info!(url = %inner.store.get()?.url, "router initialized");

        Ok(Self { inner })
    }

    /// Read-only snapshot of the router context.
    pub fn context(&self) -> Result<RouterContext, StoreError> {
        self.inner.store.get()
    }

    /// Register a global hook.
    pub fn on<F, Fut>(&self, hook: Hook, f: F) -> ListenerHandle<HookPayload>
    where
        F: Fn(HookPayload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<HookResult>> + Send + 'static,
    {
        self.inner.hooks.on(hook, callback(f))
    }

    /// Register a global hook that auto-unregisters after one invocation.
    pub fn once<F, Fut>(&self, hook: Hook, f: F) -> ListenerHandle<HookPayload>
    where
        F: Fn(HookPayload) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<HookResult>> + Send + 'static,
    {
        self.inner.hooks.once(hook, callback(f))
    }

    /// Attach a plugin. Its hooks run after per-request and global hooks, in
    /// registration order.
    pub fn use_plugin(&self, plugin: Arc<dyn Plugin>) {
        if let Ok(context) = self.inner.store.get() {
            plugin.initialized(&context);
        }
        self.inner
            .plugins
            .write()
            .expect("plugins lock poisoned")
            .push(plugin);
    }

    /// Issue a server-bound visit. Starting a new visit aborts the previous
    /// in-flight one; a response that already settled is still applied, in
    /// settlement order.
    pub async fn visit(&self, target: &str, options: VisitOptions) -> Result<VisitOutcome> {
        let inner = &self.inner;

        let mut options = options;
        if options.timeout.is_none() {
            options.timeout = inner.config.request_timeout();
        }

        let url = make_url(target, &inner.browser.location())?;
        let descriptor = RequestDescriptor {
            url: url.clone(),
            options,
        };
        let intent = descriptor.intent();

        tracing::debug!(url = %url, method = %intent.method, "visit requested");

        if !inner
            .dispatch(HookPayload::Before(intent.clone()), &descriptor.options.hooks)
            .await?
        {
            return inner.settle_failure(&descriptor, NavigationError::Cancelled).await;
        }

        let context = inner.store.get()?;
        if let Some(previous) = &context.active_visit {
            tracing::debug!(superseded = %previous.url, "aborting previous visit");
            previous.abort();
        }

        let id = inner.next_visit_id();
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        inner.store.set(
            ContextPatch::new().active_visit(Some(VisitHandle::new(id, url.clone(), abort_handle))),
            false,
        )?;

        inner
            .dispatch(HookPayload::Start(intent.clone()), &descriptor.options.hooks)
            .await?;

        let progress_inner = Arc::clone(inner);
        let progress_hooks = descriptor.options.hooks.clone();
        let progress = move |progress: TransferProgress| {
            let inner = Arc::clone(&progress_inner);
            let hooks = progress_hooks.clone();
            async move {
                inner
                    .dispatch(HookPayload::Progress(progress), &hooks)
                    .await
                    .map(|_| ())
            }
        };

        let send = request::send(&inner.client, &descriptor, &context.version, progress);
        let settled = Abortable::new(send, abort_registration).await;

        let result = match settled {
            Err(futures::future::Aborted) => {
                inner.settle_failure(&descriptor, NavigationError::Aborted).await
            }
            Ok(Err(error)) => {
                inner
                    .settle_failure(&descriptor, NavigationError::Other(error))
                    .await
            }
            Ok(Ok(response)) => {
                // From here on the exchange always runs to completion; a
                // newer visit can no longer cancel it.
                let (resolve, resolved) = oneshot::channel();
                inner.sequencer.enqueue(SettledResponse {
                    request: descriptor,
                    response,
                    resolve,
                });
                resolved
                    .await
                    .map_err(|_| anyhow!("response sequencer stopped"))
                    .and_then(|outcome| outcome)
            }
        };

        inner.clear_active_visit(id);
        result
    }

    /// Partial-reload sugar: revisit the current URL in place.
    pub async fn reload(&self, options: VisitOptions) -> Result<VisitOutcome> {
        let mut options = options;
        options.preserve_scroll = true;
        options.preserve_state = true;
        options.replace = true;

        let url = self.inner.store.get()?.url.clone();
        self.visit(url.as_str(), options).await
    }

    /// Apply a navigation without any network round-trip.
    pub async fn navigate_local(&self, visit: LocalVisit) -> Result<()> {
        let inner = &self.inner;
        let context = inner.store.get()?;

        let url = match &visit.url {
            Some(target) => make_url(target, &inner.browser.location())?,
            None => context.url.clone(),
        };

        let details = inner
            .navigate(NavigationOptions {
                kind: NavigationKind::Local,
                url,
                target: NavigationTarget {
                    component: visit.component.clone(),
                    properties: context.view.properties.clone(),
                    dialog: None,
                    version: context.version.clone(),
                },
                properties_override: visit.properties.clone(),
                preserve_scroll: visit.preserve_scroll,
                preserve_state: visit.preserve_state,
                preserve_url: false,
                history: if visit.replace {
                    HistoryWrite::Replace
                } else {
                    HistoryWrite::Push
                },
                fresh: false,
                scroll_regions: None,
            })
            .await
            .map_err(anyhow::Error::from)?;
        inner
            .dispatch(HookPayload::Navigate(details), &RequestHooks::default())
            .await?;

        Ok(())
    }

    /// Unset the dialog and return to its base (or redirect) URL with a
    /// history replace. A no-op when no dialog is mounted.
    pub async fn close_dialog(&self) -> Result<()> {
        let inner = &self.inner;
        let context = inner.store.get()?;

        let Some(dialog) = context.dialog else {
            return Ok(());
        };

        let url = dialog.redirect_url.clone().unwrap_or_else(|| dialog.base_url.clone());
        let updated = inner
            .store
            .set(ContextPatch::new().dialog(None).url(url), true)?;

        inner.store.adapter()?.close_dialog().await?;
        history::persist(inner.browser.as_ref(), inner.serializer.as_ref(), &updated, true).await?;

        tracing::debug!(url = %updated.url, "dialog closed");
        Ok(())
    }

    /// Browser back/forward: read the history slot, unserialize it, and
    /// re-apply it as a purely local navigation, restoring saved scroll.
    pub async fn on_history_pop(&self, state: Option<Value>) -> Result<()> {
        let inner = &self.inner;

        let value = state.or_else(|| inner.browser.history_state());
        let Some(value) = value else {
            tracing::debug!("history pop carried no stored state");
            return Ok(());
        };

        let saved = inner.serializer.unserialize(value)?;
        inner
            .store
            .set(ContextPatch::new().state(saved.state.clone()), false)?;

        let details = inner
            .navigate(NavigationOptions {
                kind: NavigationKind::Local,
                url: saved.url.clone(),
                target: NavigationTarget {
                    component: Some(saved.view.component.clone()),
                    properties: saved.view.properties.clone(),
                    dialog: saved.dialog.clone(),
                    version: saved.version.clone(),
                },
                properties_override: None,
                preserve_scroll: true,
                preserve_state: false,
                preserve_url: false,
                history: HistoryWrite::Skip,
                fresh: true,
                scroll_regions: Some(saved.scroll_regions.clone()),
            })
            .await
            .map_err(anyhow::Error::from)?;
        inner
            .dispatch(HookPayload::Navigate(details), &RequestHooks::default())
            .await?;

        Ok(())
    }
}
