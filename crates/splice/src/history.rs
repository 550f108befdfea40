// File: src/history.rs
// Purpose: Serializing the context into the browser history slot and back

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use splice_protocol::Properties;
use url::Url;

use crate::browser::BrowserDriver;
use crate::context::{Dialog, RouterContext, ScrollRegion, View};

/// Everything a back/forward re-application needs, written to the history
/// slot on every applied navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub url: Url,
    pub version: String,
    pub view: View,
    pub dialog: Option<Dialog>,
    pub scroll_regions: Vec<ScrollRegion>,

    #[serde(default)]
    pub state: Properties,
}

impl SavedState {
    pub fn from_context(context: &RouterContext) -> Self {
        Self {
            url: context.url.clone(),
            version: context.version.clone(),
            view: context.view.clone(),
            dialog: context.dialog.clone(),
            scroll_regions: context.scroll_regions.clone(),
            state: context.state.clone(),
        }
    }
}

/// Pluggable pair of pure functions between [`SavedState`] and the storable
/// history value. Adapters override this when component properties carry
/// values plain JSON cannot hold.
pub trait StateSerializer: Send + Sync {
    fn serialize(&self, state: &SavedState) -> Result<Value>;
    fn unserialize(&self, value: Value) -> Result<SavedState>;
}

/// Default passthrough serializer.
pub struct JsonSerializer;

impl StateSerializer for JsonSerializer {
    fn serialize(&self, state: &SavedState) -> Result<Value> {
        serde_json::to_value(state).context("history state is not serializable")
    }

    fn unserialize(&self, value: Value) -> Result<SavedState> {
        serde_json::from_value(value).context("history slot holds no valid state")
    }
}

/// Write the full context to the history slot: push for new-URL navigations,
/// replace when requested.
pub async fn persist(
    browser: &dyn BrowserDriver,
    serializer: &dyn StateSerializer,
    context: &RouterContext,
    replace: bool,
) -> Result<()> {
    let state = serializer.serialize(&SavedState::from_context(context))?;

    if replace {
        tracing::debug!(url = %context.url, "replacing history entry");
        browser.replace_state(&context.url, state).await
    } else {
        tracing::debug!(url = %context.url, "pushing history entry");
        browser.push_state(&context.url, state).await
    }
}

/// Read the current history slot back, if the browser has one.
pub fn read(
    browser: &dyn BrowserDriver,
    serializer: &dyn StateSerializer,
) -> Result<Option<SavedState>> {
    match browser.history_state() {
        Some(value) => Ok(Some(serializer.unserialize(value)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn saved() -> SavedState {
        SavedState {
            url: Url::parse("https://example.com/users/").unwrap(),
            version: "v1".to_string(),
            view: View {
                component: "users.index".to_string(),
                properties: json!({ "users": [1, 2] }).as_object().unwrap().clone(),
            },
            dialog: None,
            scroll_regions: vec![ScrollRegion { top: 120.0, left: 0.0 }],
            state: Properties::new(),
        }
    }

    #[test]
    fn json_serializer_round_trips() {
        let serializer = JsonSerializer;
        let state = saved();

        let value = serializer.serialize(&state).unwrap();
        let back = serializer.unserialize(value).unwrap();

        assert_eq!(back, state);
    }

    #[test]
    fn unserialize_rejects_garbage() {
        assert!(JsonSerializer.unserialize(json!("nonsense")).is_err());
    }
}
