//! Dotted key-path lookup into result mappings.
//!
//! `user.role` walks nested objects one segment at a time. A missing
//! segment, a non-object in the middle of the path, or a JSON `null` all
//! resolve to `None` ("not found").

use serde_json::{Map, Value};

/// Resolve `path` inside `context`.
pub fn resolve<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = context.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Text form used when comparing a resolved value against a literal.
///
/// Strings compare by their raw contents; everything else by its JSON text
/// (`true`, `42`, `{"a":1}`).
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
