// File: src/partial.rs
// Purpose: Partial-reload field selection and its header encoding

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dot-path field selection for a partial reload. Only meaningful together
/// with the marker header; an empty selection means a full reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFields {
    /// Resolve only these properties.
    #[serde(default)]
    pub only: Vec<String>,

    /// Resolve everything except these properties.
    #[serde(default)]
    pub except: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PartialDecodeError {
    #[error("partial-reload header is not a JSON array of strings: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PartialFields {
    pub fn only(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            only: paths.into_iter().map(Into::into).collect(),
            except: Vec::new(),
        }
    }

    pub fn except(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            only: Vec::new(),
            except: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// True when this request asks for a subset of properties.
    pub fn is_partial(&self) -> bool {
        !self.only.is_empty() || !self.except.is_empty()
    }
}

/// Encode a dot-path list as the JSON header value (`["a","b.c"]`).
pub fn encode_paths(paths: &[String]) -> String {
    serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON header value back into a dot-path list.
pub fn decode_paths(value: &str) -> Result<Vec<String>, PartialDecodeError> {
    Ok(serde_json::from_str(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn encode_decode_round_trip() {
        let fields = PartialFields::only(["user.name", "posts"]);
        let encoded = encode_paths(&fields.only);
        assert_eq!(encoded, r#"["user.name","posts"]"#);
        assert_eq!(decode_paths(&encoded).unwrap(), fields.only);
    }

    #[rstest]
    #[case(PartialFields::default(), false)]
    #[case(PartialFields::only(["a"]), true)]
    #[case(PartialFields::except(["b"]), true)]
    fn is_partial_reflects_selection(#[case] fields: PartialFields, #[case] expected: bool) {
        assert_eq!(fields.is_partial(), expected);
    }

    #[test]
    fn malformed_header_is_an_error() {
        assert!(decode_paths("not json").is_err());
    }
}
