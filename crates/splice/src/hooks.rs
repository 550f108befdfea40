// File: src/hooks.rs
// Purpose: Generic ordered pub/sub primitive with cancellation aggregation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::Result;
use futures::future::BoxFuture;

/// What a listener decided about the event it observed. `Cancel` is the only
/// cancellation signal; errors propagate and never count as cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    Continue,
    Cancel,
}

impl HookResult {
    pub fn is_cancel(self) -> bool {
        matches!(self, HookResult::Cancel)
    }
}

/// Type-erased async listener. Payloads are passed by value, so `P: Clone`.
pub type Callback<P> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<HookResult>> + Send + Sync>;

/// Wrap an async closure into a [`Callback`].
pub fn callback<P, F, Fut>(f: F) -> Callback<P>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<HookResult>> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(f(payload)))
}

struct Listener<P> {
    id: u64,
    once: bool,
    call: Callback<P>,
}

/// Ordered list of listeners for one event. Listeners run sequentially in
/// registration order, each awaited; triggering never short-circuits, so a
/// cancelling listener still lets later listeners observe the event.
pub struct HookBus<P> {
    listeners: Arc<Mutex<Vec<Listener<P>>>>,
    next_id: AtomicU64,
}

/// Unregistration handle returned by [`HookBus::on`]. Dropping the handle
/// does NOT unregister; call [`ListenerHandle::unregister`].
pub struct ListenerHandle<P> {
    listeners: Weak<Mutex<Vec<Listener<P>>>>,
    id: u64,
}

impl<P> ListenerHandle<P> {
    pub fn unregister(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut guard = listeners.lock().expect("hook bus poisoned");
            guard.retain(|listener| listener.id != self.id);
        }
    }
}

impl<P: Clone + Send + 'static> Default for HookBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + Send + 'static> HookBus<P> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener; the returned handle unregisters it.
    pub fn on(&self, call: Callback<P>) -> ListenerHandle<P> {
        self.register(call, false)
    }

    /// Register a listener that auto-unregisters after its first invocation.
    pub fn once(&self, call: Callback<P>) -> ListenerHandle<P> {
        self.register(call, true)
    }

    fn register(&self, call: Callback<P>, once: bool) -> ListenerHandle<P> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.listeners.lock().expect("hook bus poisoned");
        guard.push(Listener { id, once, call });
        ListenerHandle {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    /// Invoke the extra callback (if given), then every listener in
    /// registration order. Returns `Ok(false)` iff the extra callback or any
    /// listener cancelled; listener errors propagate immediately.
    pub async fn trigger(&self, payload: P, extra: Option<&Callback<P>>) -> Result<bool> {
        let mut cancelled = false;

        if let Some(extra) = extra {
            if extra(payload.clone()).await?.is_cancel() {
                cancelled = true;
            }
        }

        // Snapshot so listeners may register/unregister while we run.
        let snapshot: Vec<(u64, bool, Callback<P>)> = {
            let guard = self.listeners.lock().expect("hook bus poisoned");
            guard
                .iter()
                .map(|l| (l.id, l.once, Arc::clone(&l.call)))
                .collect()
        };

        let mut fired_once = Vec::new();
        for (id, once, call) in snapshot {
            if once {
                fired_once.push(id);
            }
            if call(payload.clone()).await?.is_cancel() {
                cancelled = true;
            }
        }

        if !fired_once.is_empty() {
            let mut guard = self.listeners.lock().expect("hook bus poisoned");
            guard.retain(|listener| !fired_once.contains(&listener.id));
        }

        Ok(!cancelled)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.listeners.lock().expect("hook bus poisoned").len()
    }
}
