//! Request body assembly and response interpretation.

use serde_json::{Map, Value};

use crate::form::FormState;

/// Merge computed fields over the form's own values.
///
/// A computed `Null` removes the key, for form fields that are only
/// submitted under another name.
#[must_use]
pub fn merge(form: &FormState, computed: Map<String, Value>) -> Map<String, Value> {
    let mut payload = form.to_map();
    for (key, value) in computed {
        if value.is_null() {
            payload.remove(&key);
        } else {
            payload.insert(key, value);
        }
    }
    payload
}

/// Server-assigned identifier from a success body.
///
/// A bare string or number is the identifier itself; an object carries it
/// under `id_field`.
#[must_use]
pub fn extract_id(body: &Value, id_field: &str) -> Option<String> {
    match body {
        Value::Object(map) => map.get(id_field).and_then(scalar),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Replace `{id}` in a route template.
#[must_use]
pub fn follow_on_route(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}
