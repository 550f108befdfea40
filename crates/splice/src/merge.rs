// File: src/merge.rs
// Purpose: Partial property merge and validation-error resolution

use serde_json::{Map, Value};
use splice_protocol::Properties;

const ERRORS_KEY: &str = "errors";

/// Merge an incoming partial property bag onto the original one.
///
/// Leaves from the incoming bag win; objects and arrays merge key-wise rather
/// than being replaced wholesale. The `errors` sub-bag is the exception: it
/// must never accumulate stale validation errors, so with an error-bag scope
/// only `errors[scope]` is overwritten (empty when absent from the incoming
/// bag), and without a scope the whole `errors` key is replaced or removed.
pub fn merge_partial(
    original: &Properties,
    incoming: &Properties,
    error_bag: Option<&str>,
) -> Properties {
    let mut result = original.clone();

    for (key, value) in incoming {
        if key == ERRORS_KEY {
            continue;
        }
        match result.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                result.insert(key.clone(), value.clone());
            }
        }
    }

    match error_bag {
        Some(scope) => {
            let incoming_scope = incoming
                .get(ERRORS_KEY)
                .and_then(|errors| errors.get(scope))
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));

            let errors = result
                .entry(ERRORS_KEY.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !errors.is_object() {
                *errors = Value::Object(Map::new());
            }
            errors
                .as_object_mut()
                .expect("errors is an object")
                .insert(scope.to_string(), incoming_scope);
        }
        None => match incoming.get(ERRORS_KEY) {
            Some(errors) => {
                result.insert(ERRORS_KEY.to_string(), errors.clone());
            }
            None => {
                result.remove(ERRORS_KEY);
            }
        },
    }

    result
}

/// Key-wise recursive merge; incoming leaves win, array elements merge by
/// index with extra incoming elements appended.
fn deep_merge(original: &mut Value, incoming: &Value) {
    match (original, incoming) {
        (Value::Object(original), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match original.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        original.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(original), Value::Array(incoming)) => {
            for (index, value) in incoming.iter().enumerate() {
                match original.get_mut(index) {
                    Some(existing) => deep_merge(existing, value),
                    None => original.push(value.clone()),
                }
            }
        }
        (original, incoming) => {
            *original = incoming.clone();
        }
    }
}

/// The effective validation errors of a property bag: the whole `errors`
/// object, or `errors[scope]` when the request named an error bag. Always an
/// object, empty when nothing is there.
pub fn resolve_errors(properties: &Properties, error_bag: Option<&str>) -> Value {
    let errors = properties
        .get(ERRORS_KEY)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    let resolved = match error_bag {
        Some(scope) => errors
            .get(scope)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        None => errors,
    };

    if resolved.is_object() {
        resolved
    } else {
        Value::Object(Map::new())
    }
}

/// True when a resolved errors object actually carries errors.
pub fn has_errors(resolved: &Value) -> bool {
    resolved.as_object().map(|map| !map.is_empty()).unwrap_or(false)
}
