// File: tests/support/mod.rs
// Purpose: In-memory browser/adapter fakes and an axum server speaking the protocol
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::{json, Value};
use url::Url;

use splice::{
    Adapter, BrowserDriver, Dialog, Hook, HookPayload, HookResult, InitOptions, RawResponse,
    ResolvedComponent, Router, RouterConfig, RouterContext, ScrollRegion, View, VisitPayload,
};

// ============================================================================
// Fake browser
// ============================================================================

#[derive(Default)]
pub struct FakeBrowser {
    location: Mutex<Option<Url>>,
    state: Mutex<Option<Value>>,
    pub pushes: Mutex<Vec<(Url, Value)>>,
    pub replaces: Mutex<Vec<(Url, Value)>>,
    pub externals: Mutex<Vec<Url>>,
    pub downloads: Mutex<Vec<Url>>,
    pub overlays: Mutex<Vec<String>>,
    pub scroll: Mutex<Vec<ScrollRegion>>,
    pub restored: Mutex<Vec<Vec<ScrollRegion>>>,
    pub top_resets: AtomicUsize,
}

impl FakeBrowser {
    pub fn at(location: &str) -> Arc<Self> {
        let browser = Self::default();
        *browser.location.lock().unwrap() = Some(Url::parse(location).unwrap());
        Arc::new(browser)
    }

    pub fn set_scroll(&self, regions: Vec<ScrollRegion>) {
        *self.scroll.lock().unwrap() = regions;
    }

    pub fn clear_state(&self) {
        *self.state.lock().unwrap() = None;
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn last_pushed_state(&self) -> Option<Value> {
        self.pushes.lock().unwrap().last().map(|(_, state)| state.clone())
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    fn location(&self) -> Url {
        self.location.lock().unwrap().clone().expect("fake browser has a location")
    }

    async fn push_state(&self, url: &Url, state: Value) -> anyhow::Result<()> {
        *self.location.lock().unwrap() = Some(url.clone());
        *self.state.lock().unwrap() = Some(state.clone());
        self.pushes.lock().unwrap().push((url.clone(), state));
        Ok(())
    }

    async fn replace_state(&self, url: &Url, state: Value) -> anyhow::Result<()> {
        *self.location.lock().unwrap() = Some(url.clone());
        *self.state.lock().unwrap() = Some(state.clone());
        self.replaces.lock().unwrap().push((url.clone(), state));
        Ok(())
    }

    fn history_state(&self) -> Option<Value> {
        self.state.lock().unwrap().clone()
    }

    fn capture_scroll(&self) -> Vec<ScrollRegion> {
        self.scroll.lock().unwrap().clone()
    }

    fn restore_scroll(&self, regions: &[ScrollRegion]) {
        self.restored.lock().unwrap().push(regions.to_vec());
    }

    fn scroll_to_top(&self) {
        self.top_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn load_external(&self, url: &Url) {
        self.externals.lock().unwrap().push(url.clone());
    }

    fn download(&self, response: &RawResponse) {
        self.downloads.lock().unwrap().push(response.url.clone());
    }

    fn show_error_overlay(&self, response: &RawResponse) {
        self.overlays.lock().unwrap().push(response.text());
    }
}

// ============================================================================
// Fake adapter
// ============================================================================

#[derive(Default)]
pub struct FakeAdapter {
    pub resolved: Mutex<Vec<String>>,
    pub view_swaps: Mutex<Vec<(String, bool)>>,
    pub dialog_swaps: Mutex<Vec<String>>,
    pub dialog_closes: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FakeAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn swapped_components(&self) -> Vec<String> {
        self.view_swaps.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    async fn resolve(&self, component: &str) -> anyhow::Result<ResolvedComponent> {
        self.resolved.lock().unwrap().push(component.to_string());
        Ok(Box::new(component.to_string()))
    }

    async fn swap_view(
        &self,
        component: ResolvedComponent,
        _view: &View,
        preserve_state: bool,
    ) -> anyhow::Result<()> {
        let name = component.downcast::<String>().map(|c| *c).unwrap_or_default();
        self.view_swaps.lock().unwrap().push((name, preserve_state));
        Ok(())
    }

    async fn swap_dialog(&self, component: ResolvedComponent, _dialog: &Dialog) -> anyhow::Result<()> {
        let name = component.downcast::<String>().map(|c| *c).unwrap_or_default();
        self.dialog_swaps.lock().unwrap().push(name);
        Ok(())
    }

    async fn close_dialog(&self) -> anyhow::Result<()> {
        self.dialog_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_context_update(&self, _context: &RouterContext) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Test server
// ============================================================================

fn marker() -> (HeaderName, &'static str) {
    (HeaderName::from_static("x-splice"), "true")
}

fn base_of(headers: &HeaderMap) -> String {
    let host = headers
        .get("host")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

fn hybrid(payload: Value) -> Response {
    ([marker()], Json(payload)).into_response()
}

fn requested_only(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-splice-only")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| serde_json::from_str(value).ok())
        .unwrap_or_default()
}

async fn users(request: Request) -> Response {
    let headers = request.headers();
    let base = base_of(headers);
    let only = requested_only(headers);

    let properties = if only.contains(&"stats".to_string()) {
        json!({ "stats": { "count": 2 } })
    } else {
        json!({ "users": [1, 2, 3], "stats": { "count": 1 } })
    };

    hybrid(json!({
        "url": format!("{base}/users"),
        "version": "v1",
        "view": { "component": "users.index", "properties": properties }
    }))
}

async fn slow(request: Request) -> Response {
    tokio::time::sleep(Duration::from_millis(300)).await;
    let base = base_of(request.headers());
    hybrid(json!({
        "url": format!("{base}/slow"),
        "version": "v1",
        "view": { "component": "slow.page", "properties": {} }
    }))
}

async fn form_errors(request: Request) -> Response {
    let base = base_of(request.headers());
    hybrid(json!({
        "url": format!("{base}/errors"),
        "version": "v1",
        "view": {
            "component": "form.page",
            "properties": { "errors": { "email": "already taken" } }
        }
    }))
}

async fn with_dialog(request: Request) -> Response {
    let base = base_of(request.headers());
    hybrid(json!({
        "url": format!("{base}/users/3/edit"),
        "version": "v1",
        "view": { "component": "users.index", "properties": { "users": [1, 2, 3] } },
        "dialog": {
            "component": "users.edit",
            "properties": { "user": { "id": 3 } },
            "baseUrl": format!("{base}/users"),
            "redirectUrl": format!("{base}/users")
        }
    }))
}

async fn invalid() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(HeaderName::from_static("content-type"), "text/html")],
        "<h1>Server Error</h1>",
    )
        .into_response()
}

async fn external() -> Response {
    (
        [(HeaderName::from_static("x-splice-location"), "/upgraded")],
        "",
    )
        .into_response()
}

async fn download() -> Response {
    (
        [
            (HeaderName::from_static("content-type"), "application/octet-stream"),
            (
                HeaderName::from_static("content-disposition"),
                "attachment; filename=\"report.csv\"",
            ),
        ],
        "id,name\n1,a\n",
    )
        .into_response()
}

/// Bind an ephemeral port and serve the protocol routes; returns the base URL.
pub async fn spawn_server() -> String {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let app = axum::Router::new()
        .route("/users", get(users).post(users))
        .route("/slow", get(slow))
        .route("/errors", get(form_errors))
        .route("/dialog", get(with_dialog))
        .route("/invalid", get(invalid))
        .route("/external", get(external))
        .route("/download", get(download));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

// ============================================================================
// Router bootstrap and hook recording
// ============================================================================

pub async fn init_router(base: &str) -> (Router, Arc<FakeAdapter>, Arc<FakeBrowser>) {
    let browser = FakeBrowser::at(&format!("{base}/"));
    let adapter = FakeAdapter::new();

    let router = Router::initialize(InitOptions {
        payload: VisitPayload::new(format!("{base}/"), "v1", "home"),
        adapter: Arc::clone(&adapter) as Arc<dyn Adapter>,
        browser: Arc::clone(&browser) as Arc<dyn BrowserDriver>,
        serializer: None,
        config: RouterConfig::default(),
        plugins: Vec::new(),
    })
    .await
    .unwrap();

    (router, adapter, browser)
}

/// Register recording listeners for the given hooks; the log fills with hook
/// names in invocation order.
pub fn record_hooks(router: &Router, hooks: &[Hook]) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for &hook in hooks {
        let log = Arc::clone(&log);
        router.on(hook, move |payload: HookPayload| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{:?}", payload.hook()));
                Ok(HookResult::Continue)
            }
        });
    }
    log
}

pub fn logged(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}
