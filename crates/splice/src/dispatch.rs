// File: src/dispatch.rs
// Purpose: Named hook kinds and the three-source dispatch rule

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use splice_protocol::VisitPayload;

use crate::error::NavigationError;
use crate::hooks::{Callback, HookBus, ListenerHandle};
use crate::navigate::NavigateDetails;
use crate::plugin::Plugin;
use crate::request::{RawResponse, TransferProgress, VisitIntent};

/// The fixed set of lifecycle events a visit can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Before,
    Start,
    Progress,
    Data,
    Success,
    Error,
    Abort,
    Invalid,
    Exception,
    Fail,
    After,
    Navigate,
}

impl Hook {
    pub const ALL: [Hook; 12] = [
        Hook::Before,
        Hook::Start,
        Hook::Progress,
        Hook::Data,
        Hook::Success,
        Hook::Error,
        Hook::Abort,
        Hook::Invalid,
        Hook::Exception,
        Hook::Fail,
        Hook::After,
        Hook::Navigate,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// One payload type per hook kind.
#[derive(Clone)]
pub enum HookPayload {
    /// About to start a visit; cancellable.
    Before(VisitIntent),
    /// The request is on the wire.
    Start(VisitIntent),
    /// Body download progress.
    Progress(TransferProgress),
    /// A raw response arrived and is about to be interpreted; cancellable.
    Data(RawResponse),
    /// A payload was applied and carried no validation errors.
    Success(VisitPayload),
    /// A payload was applied and carried validation errors (resolved bag).
    Error(Value),
    /// The visit was cancelled or its request aborted.
    Abort(Arc<NavigationError>),
    /// The response was not a hybrid response.
    Invalid(RawResponse),
    /// Any other failure: network, parse, adapter.
    Exception(Arc<NavigationError>),
    /// Catch-all failure signal, emitted in addition to the specific hook.
    Fail(Arc<NavigationError>),
    /// The exchange finished, success or not.
    After(VisitIntent),
    /// The navigation engine applied a view transition.
    Navigate(NavigateDetails),
}

impl HookPayload {
    pub fn hook(&self) -> Hook {
        match self {
            HookPayload::Before(_) => Hook::Before,
            HookPayload::Start(_) => Hook::Start,
            HookPayload::Progress(_) => Hook::Progress,
            HookPayload::Data(_) => Hook::Data,
            HookPayload::Success(_) => Hook::Success,
            HookPayload::Error(_) => Hook::Error,
            HookPayload::Abort(_) => Hook::Abort,
            HookPayload::Invalid(_) => Hook::Invalid,
            HookPayload::Exception(_) => Hook::Exception,
            HookPayload::Fail(_) => Hook::Fail,
            HookPayload::After(_) => Hook::After,
            HookPayload::Navigate(_) => Hook::Navigate,
        }
    }
}

/// Globally registered hooks: one bus per kind, dispatched by lookup table.
pub struct HookRegistrar {
    buses: [HookBus<HookPayload>; 12],
}

impl Default for HookRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistrar {
    pub fn new() -> Self {
        Self {
            buses: std::array::from_fn(|_| HookBus::new()),
        }
    }

    pub fn bus(&self, hook: Hook) -> &HookBus<HookPayload> {
        &self.buses[hook.index()]
    }

    pub fn on(&self, hook: Hook, call: Callback<HookPayload>) -> ListenerHandle<HookPayload> {
        self.bus(hook).on(call)
    }

    pub fn once(&self, hook: Hook, call: Callback<HookPayload>) -> ListenerHandle<HookPayload> {
        self.bus(hook).once(call)
    }
}

/// Per-request ad hoc hook map: at most one callback per kind.
#[derive(Clone, Default)]
pub struct RequestHooks {
    slots: [Option<Callback<HookPayload>>; 12],
}

impl RequestHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, hook: Hook, call: Callback<HookPayload>) -> Self {
        self.slots[hook.index()] = Some(call);
        self
    }

    pub fn get(&self, hook: Hook) -> Option<&Callback<HookPayload>> {
        self.slots[hook.index()].as_ref()
    }
}

impl std::fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<Hook> = Hook::ALL
            .into_iter()
            .filter(|hook| self.slots[hook.index()].is_some())
            .collect();
        f.debug_struct("RequestHooks").field("registered", &registered).finish()
    }
}

/// Run one named hook through its three sources, in fixed order: the
/// request's own callback, then global hooks, then every plugin in
/// registration order. All sources always run; the aggregate is a veto if ANY
/// source cancelled. Source errors propagate unswallowed.
pub async fn dispatch(
    payload: HookPayload,
    request: &RequestHooks,
    global: &HookRegistrar,
    plugins: &[Arc<dyn Plugin>],
) -> Result<bool> {
    let hook = payload.hook();
    let mut cancelled = false;

    if let Some(call) = request.get(hook) {
        if call(payload.clone()).await?.is_cancel() {
            cancelled = true;
        }
    }

    if !global.bus(hook).trigger(payload.clone(), None).await? {
        cancelled = true;
    }

    for plugin in plugins {
        if plugin.on_hook(hook, payload.clone()).await?.is_cancel() {
            tracing::debug!(plugin = plugin.name(), ?hook, "plugin vetoed hook");
            cancelled = true;
        }
    }

    Ok(!cancelled)
}

pub use crate::hooks::callback;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    fn intent() -> VisitIntent {
        VisitIntent {
            url: Url::parse("https://example.com/").unwrap(),
            method: http::Method::GET,
            partial: Default::default(),
            replace: false,
        }
    }

    struct CountingPlugin {
        seen: Arc<AtomicUsize>,
        veto: bool,
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            "counting"
        }

        async fn on_hook(&self, _hook: Hook, _payload: HookPayload) -> Result<HookResult> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(if self.veto { HookResult::Cancel } else { HookResult::Continue })
        }
    }

    #[tokio::test]
    async fn request_veto_still_lets_plugins_observe() {
        let global = HookRegistrar::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(CountingPlugin {
            seen: Arc::clone(&seen),
            veto: false,
        })];
        let request = RequestHooks::new().on(
            Hook::Before,
            callback(|_| async { Ok(HookResult::Cancel) }),
        );

        let proceed = dispatch(HookPayload::Before(intent()), &request, &global, &plugins)
            .await
            .unwrap();

        assert!(!proceed);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn any_source_cancelling_vetoes() {
        let global = HookRegistrar::new();
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(CountingPlugin {
            seen: Arc::new(AtomicUsize::new(0)),
            veto: true,
        })];

        let proceed = dispatch(
            HookPayload::Before(intent()),
            &RequestHooks::new(),
            &global,
            &plugins,
        )
        .await
        .unwrap();

        assert!(!proceed);
    }
}
