// Splice - client-side navigation engine for hybrid server-rendered apps
//
// The server answers a tagged request with a JSON visit payload instead of a
// full HTML document; this crate decides when to issue such a request, how to
// merge partial property sets, how to persist state through browser history,
// how to sequence racing responses, and how to recover from failure. UI
// rendering stays behind the [`Adapter`] trait; the hosting environment stays
// behind [`BrowserDriver`].

pub mod adapter;
pub mod browser;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod history;
pub mod hooks;
pub mod merge;
pub mod navigate;
pub mod plugin;
pub mod request;
pub mod router;
pub mod sequencer;
pub mod url;

pub use adapter::{Adapter, ResolvedComponent};
pub use browser::BrowserDriver;
pub use config::RouterConfig;
pub use context::{
    ContextPatch, ContextStore, Dialog, RouterContext, ScrollRegion, StoreError, View, VisitHandle,
};
pub use dispatch::{Hook, HookPayload, HookRegistrar, RequestHooks};
pub use error::{ErrorKind, NavigationError};
pub use history::{JsonSerializer, SavedState, StateSerializer};
pub use hooks::{callback, HookBus, HookResult, ListenerHandle};
pub use merge::{merge_partial, resolve_errors};
pub use navigate::{NavigateDetails, NavigationKind};
pub use plugin::Plugin;
pub use request::{RawResponse, TransferProgress, VisitIntent, VisitOptions};
pub use router::{InitOptions, LocalVisit, Router, VisitOutcome};
pub use url::{fill_hash, make_url, same_urls};

// Re-export the wire vocabulary so embedders need only one dependency.
pub use splice_protocol as protocol;
pub use splice_protocol::{DialogPayload, PartialFields, Properties, ViewPayload, VisitPayload};
