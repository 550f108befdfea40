// File: src/payload.rs
// Purpose: Serde types for the visit payload carried by hybrid responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bag attached to a view or dialog.
pub type Properties = serde_json::Map<String, Value>;

/// Body of a successful hybrid response: everything the client needs to
/// perform one view transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitPayload {
    /// Absolute URL the payload belongs to.
    pub url: String,

    /// Opaque asset-version string; a mismatch forces a full navigation.
    pub version: String,

    /// The base view to mount or update.
    pub view: ViewPayload,

    /// Optional overlay view, navigable independently of the base view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<DialogPayload>,
}

/// Component identifier plus its resolved properties. An omitted component
/// means "same view as before" (partial reloads).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(default)]
    pub properties: Properties,
}

/// Overlay view layered on top of the base view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogPayload {
    pub component: String,

    #[serde(default)]
    pub properties: Properties,

    /// URL of the page the dialog was opened over.
    pub base_url: String,

    /// Where to navigate when the dialog is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,

    /// Identity of this dialog instance; a new key remounts the component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl VisitPayload {
    pub fn new(url: impl Into<String>, version: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: version.into(),
            view: ViewPayload {
                component: Some(component.into()),
                properties: Properties::new(),
            },
            dialog: None,
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.view.properties = properties;
        self
    }

    pub fn with_dialog(mut self, dialog: DialogPayload) -> Self {
        self.dialog = Some(dialog);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn payload_deserializes_with_omitted_component() {
        let payload: VisitPayload = serde_json::from_value(json!({
            "url": "https://example.com/users/",
            "version": "abc123",
            "view": { "properties": { "users": [1, 2, 3] } }
        }))
        .unwrap();

        assert_eq!(payload.view.component, None);
        assert_eq!(payload.view.properties["users"], json!([1, 2, 3]));
        assert_eq!(payload.dialog, None);
    }

    #[test]
    fn dialog_uses_camel_case_on_the_wire() {
        let payload: VisitPayload = serde_json::from_value(json!({
            "url": "https://example.com/users/3/edit",
            "version": "abc123",
            "view": { "component": "users.index", "properties": {} },
            "dialog": {
                "component": "users.edit",
                "properties": { "user": { "id": 3 } },
                "baseUrl": "https://example.com/users/",
                "redirectUrl": "https://example.com/users/",
                "key": "d-1"
            }
        }))
        .unwrap();

        let dialog = payload.dialog.unwrap();
        assert_eq!(dialog.base_url, "https://example.com/users/");
        assert_eq!(dialog.redirect_url.as_deref(), Some("https://example.com/users/"));
        assert_eq!(dialog.key.as_deref(), Some("d-1"));
    }
}
