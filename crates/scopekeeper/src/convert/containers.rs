//! Converters for container and tri-state values, plus dotted-path access
//! into wire JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::state::Value;

/// Ordered sequence to wire. Anything but a list becomes `[]`.
pub fn list_to_wire(value: &Value) -> Json {
    match value {
        Value::List(items) => Json::Array(items.iter().cloned().map(Json::String).collect()),
        _ => Json::Array(Vec::new()),
    }
}

/// Wire array to ordered sequence, keeping order. Missing or null becomes `[]`.
pub fn list_from_wire(wire: Option<&Json>) -> Value {
    let items = match wire {
        Some(Json::Array(items)) => items.iter().map(json_to_string).collect(),
        _ => Vec::new(),
    };
    Value::List(items)
}

/// String mapping to wire. Anything but a map becomes `{}`.
pub fn map_to_wire(value: &Value) -> Json {
    match value {
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), Json::String(v.clone())))
                .collect(),
        ),
        _ => Json::Object(Map::new()),
    }
}

/// Wire object to string mapping. Non-string values are stringified.
pub fn map_from_wire(wire: Option<&Json>) -> Value {
    let entries: BTreeMap<String, String> = match wire {
        Some(Json::Object(entries)) => entries
            .iter()
            .map(|(k, v)| (k.clone(), json_to_string(v)))
            .collect(),
        _ => BTreeMap::new(),
    };
    Value::Map(entries)
}

/// `Some(bool)` when explicitly set, `None` (key omitted) otherwise.
pub fn tri_bool_to_wire(value: &Value) -> Option<Json> {
    value.as_bool().map(Json::Bool)
}

pub fn tri_bool_from_wire(wire: Option<&Json>) -> Value {
    match wire {
        Some(Json::Bool(b)) => Value::Bool(*b),
        _ => Value::Null,
    }
}

fn json_to_string(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// Reads a dotted path from a JSON object tree.
pub fn wire_get<'a>(root: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Writes a dotted path into a JSON object tree, creating intermediate objects.
pub fn wire_set(root: &mut Json, path: &str, value: Json) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut node = root;
    for segment in segments {
        if !node.is_object() {
            *node = Json::Object(Map::new());
        }
        let Json::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Json::Object(Map::new());
    }
    if let Json::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}
