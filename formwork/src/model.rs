//! The value model and the dotted-path mapper.
//!
//! Fields expose their values as a flat map of `name -> value`. Names may
//! carry `.`-delimited path segments (`address.city`), which [`to_nested`]
//! projects into a nested object tree. Only the forward mapping exists;
//! sessions configured with a custom mapping function bypass it entirely.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Flat value model: field name -> current value.
///
/// Materialized from the field directory on demand and never cached across
/// validation passes. Duplicate field names are last-write-wins.
pub type Values = HashMap<String, Value>;

/// Project a flat value model into a nested object tree.
///
/// Each key is split on `.`; intermediate segments become objects and the
/// terminal segment receives the value. Keys are visited in sorted order so
/// the result is deterministic; a path segment that runs into an existing
/// non-object value leaves that value in place.
pub fn to_nested(flat: &Values) -> Value {
    let mut entries: Vec<(&String, &Value)> = flat.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut root = Map::new();
    for (key, value) in entries {
        insert_path(&mut root, key, value.clone());
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut node = root;
    for segment in segments {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry.as_object_mut() {
            Some(object) => node = object,
            // A scalar already occupies this segment; the path is dead.
            None => return,
        }
    }
    node.insert(last.to_string(), value);
}
