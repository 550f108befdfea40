// File: src/navigate.rs
// Purpose: The navigation engine - applying a view transition to the context

use splice_protocol::{DialogPayload, Properties};
use url::Url;

use crate::context::{ContextPatch, Dialog, ScrollRegion, View};
use crate::error::NavigationError;
use crate::history;
use crate::request::VisitOptions;
use crate::router::RouterInner;
use crate::url::{make_url, same_urls};

/// Whether a navigation came from a server payload or is a purely local
/// state change (initialization, history pop, programmatic update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Local,
    Server,
}

/// What to do with the browser history slot for this navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HistoryWrite {
    Push,
    Replace,
    /// Back/forward re-application: the slot already holds the entry.
    Skip,
}

/// The view transition to apply, already converted out of wire types.
#[derive(Debug, Clone)]
pub(crate) struct NavigationTarget {
    /// Component identifier; `None` means "same view as before".
    pub component: Option<String>,

    /// The target's own property bag (ignored when an override is given).
    pub properties: Properties,

    /// Dialog declared by the target. An absent dialog clears the mounted
    /// one only on a fresh navigation, never on a merge.
    pub dialog: Option<Dialog>,

    pub version: String,
}

#[derive(Debug)]
pub(crate) struct NavigationOptions {
    pub kind: NavigationKind,
    pub url: Url,
    pub target: NavigationTarget,

    /// Merged or explicit properties that win over the target's own.
    pub properties_override: Option<Properties>,

    pub preserve_scroll: bool,
    pub preserve_state: bool,
    pub preserve_url: bool,
    pub history: HistoryWrite,

    /// True for full navigations; lets an absent dialog clear the mounted one.
    pub fresh: bool,

    /// Explicit scroll regions to install (history pop restoration).
    pub scroll_regions: Option<Vec<ScrollRegion>>,
}

/// Hook-facing summary of an applied navigation.
#[derive(Debug, Clone)]
pub struct NavigateDetails {
    pub url: Url,
    pub kind: NavigationKind,
    pub replace: bool,
    pub preserve_scroll: bool,
    pub preserve_state: bool,
}

/// History-write decision for a server navigation: replace when the caller
/// asked for it, when the URL is preserved, or when the incoming URL
/// collapses to the current one with only the hash differing (avoids pushing
/// a duplicate entry for hash-only same-page jumps).
pub(crate) fn should_replace(options: &VisitOptions, incoming: &Url, location: &Url) -> bool {
    options.replace
        || options.preserve_url
        || (same_urls(&[incoming, location]) && incoming.fragment() != location.fragment())
}

/// Convert a wire dialog into the context's dialog record.
pub(crate) fn dialog_from_payload(
    payload: &DialogPayload,
    base: &Url,
) -> Result<Dialog, NavigationError> {
    let base_url = make_url(&payload.base_url, base).map_err(NavigationError::Other)?;
    let redirect_url = payload
        .redirect_url
        .as_deref()
        .map(|target| make_url(target, base))
        .transpose()
        .map_err(NavigationError::Other)?;

    Ok(Dialog {
        component: payload.component.clone(),
        properties: payload.properties.clone(),
        base_url,
        redirect_url,
        key: payload.key.clone(),
    })
}

impl RouterInner {
    /// Apply one view transition: update the context, swap the mounted
    /// view/dialog through the adapter, persist to history, settle scroll.
    /// The adapter swap is awaited before the history write, since resolving
    /// a component may itself be asynchronous.
    pub(crate) async fn navigate(
        &self,
        options: NavigationOptions,
    ) -> Result<NavigateDetails, NavigationError> {
        let previous = self.store.get().map_err(|e| NavigationError::Other(e.into()))?;

        let dialog_only = options.target.component.is_none()
            && options.properties_override.is_none()
            && options.target.dialog.is_some();

        let final_view = if dialog_only {
            None
        } else {
            let component = options
                .target
                .component
                .clone()
                .unwrap_or_else(|| previous.view.component.clone());
            let properties = options
                .properties_override
                .clone()
                .unwrap_or_else(|| options.target.properties.clone());
            Some(View { component, properties })
        };

        // None = leave the mounted dialog alone; Some(None) = clear it.
        let dialog_patch: Option<Option<Dialog>> = match &options.target.dialog {
            Some(dialog) => Some(Some(dialog.clone())),
            None if options.fresh && !dialog_only => Some(None),
            None => None,
        };

        let mut patch = ContextPatch::new().version(options.target.version.clone());
        if !options.preserve_url {
            patch = patch.url(options.url.clone());
        }
        if let Some(view) = final_view.clone() {
            patch = patch.view(view);
        }
        if let Some(dialog) = dialog_patch.clone() {
            patch = patch.dialog(dialog);
        }
        if let Some(regions) = options.scroll_regions.clone() {
            patch = patch.scroll_regions(regions);
        } else if !options.preserve_scroll {
            patch = patch.scroll_regions(Vec::new());
        }

        let updated = self
            .store
            .set(patch, true)
            .map_err(|e| NavigationError::Other(e.into()))?;

        let adapter = self.store.adapter().map_err(|e| NavigationError::Other(e.into()))?;

        if let Some(view) = &final_view {
            let component = adapter
                .resolve(&view.component)
                .await
                .map_err(NavigationError::Other)?;
            adapter
                .swap_view(component, view, options.preserve_state)
                .await
                .map_err(NavigationError::Other)?;
        }

        match &dialog_patch {
            Some(Some(dialog)) => {
                let component = adapter
                    .resolve(&dialog.component)
                    .await
                    .map_err(NavigationError::Other)?;
                adapter
                    .swap_dialog(component, dialog)
                    .await
                    .map_err(NavigationError::Other)?;
            }
            Some(None) if previous.dialog.is_some() => {
                adapter.close_dialog().await.map_err(NavigationError::Other)?;
            }
            _ => {}
        }

        match options.history {
            HistoryWrite::Push => {
                history::persist(self.browser.as_ref(), self.serializer.as_ref(), &updated, false)
                    .await
                    .map_err(NavigationError::Other)?;
            }
            HistoryWrite::Replace => {
                history::persist(self.browser.as_ref(), self.serializer.as_ref(), &updated, true)
                    .await
                    .map_err(NavigationError::Other)?;
            }
            HistoryWrite::Skip => {}
        }

        if options.preserve_scroll {
            self.browser.restore_scroll(&updated.scroll_regions);
        } else {
            self.browser.scroll_to_top();
        }

        tracing::info!(
            url = %updated.url,
            kind = ?options.kind,
            replace = matches!(options.history, HistoryWrite::Replace),
            "navigation applied"
        );

        Ok(NavigateDetails {
            url: updated.url.clone(),
            kind: options.kind,
            replace: matches!(options.history, HistoryWrite::Replace),
            preserve_scroll: options.preserve_scroll,
            preserve_state: options.preserve_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case(false, false, "https://h/a", "https://h/b", false)]
    #[case(true, false, "https://h/a", "https://h/b", true)]
    #[case(false, true, "https://h/a", "https://h/b", true)]
    // Same URL, hash-only difference: replace instead of a duplicate push.
    #[case(false, false, "https://h/a#top", "https://h/a", true)]
    // Same URL, same (absent) hash: an ordinary push.
    #[case(false, false, "https://h/a", "https://h/a", false)]
    fn replace_rule(
        #[case] replace: bool,
        #[case] preserve_url: bool,
        #[case] incoming: &str,
        #[case] location: &str,
        #[case] expected: bool,
    ) {
        let options = VisitOptions {
            replace,
            preserve_url,
            ..VisitOptions::default()
        };
        assert_eq!(
            should_replace(&options, &url(incoming), &url(location)),
            expected
        );
    }

    #[test]
    fn dialog_conversion_resolves_relative_urls() {
        let payload = DialogPayload {
            component: "users.edit".to_string(),
            properties: Properties::new(),
            base_url: "/users/".to_string(),
            redirect_url: Some("/users/?sorted=1".to_string()),
            key: None,
        };

        let dialog = dialog_from_payload(&payload, &url("https://example.com/anything")).unwrap();

        assert_eq!(dialog.base_url.as_str(), "https://example.com/users/");
        assert_eq!(
            dialog.redirect_url.as_ref().map(Url::as_str),
            Some("https://example.com/users/?sorted=1")
        );
    }
}
