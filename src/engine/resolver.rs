//! Reference resolution for property trees.
//!
//! A placeholder is a string value of the exact form `${id_reference}`.
//! Resolution replaces every placeholder whose reference is present in the
//! run's [`IdMap`] and leaves every other value untouched.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Prefix of the synthetic identifier published for resources that were
/// skipped without a discoverable server id.
pub const SYNTHETIC_ID_PREFIX: &str = "dry-run-";

/// Mapping from `id_reference` to the server-assigned identifier.
///
/// Built incrementally during a single run and discarded afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdMap {
    ids: HashMap<String, String>,
}

impl IdMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the identifier for `id_reference`.
    pub fn publish(&mut self, id_reference: impl Into<String>, server_id: impl Into<String>) {
        self.ids.insert(id_reference.into(), server_id.into());
    }

    /// Publishes the synthetic identifier for `id_reference`.
    pub fn publish_synthetic(&mut self, id_reference: &str) {
        self.publish(id_reference, synthetic_id(id_reference));
    }

    /// Returns the identifier published for `id_reference`.
    #[must_use]
    pub fn get(&self, id_reference: &str) -> Option<&str> {
        self.ids.get(id_reference).map(String::as_str)
    }
}

/// Returns the synthetic identifier for `id_reference`.
#[must_use]
pub fn synthetic_id(id_reference: &str) -> String {
    format!("{SYNTHETIC_ID_PREFIX}{id_reference}")
}

/// Returns the reference named by `s` if it is exactly `${reference}`.
#[must_use]
pub fn parse_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;

    if inner.is_empty() || inner.contains(['{', '}']) {
        None
    } else {
        Some(inner)
    }
}

/// Resolves every placeholder in `value` against `id_map`.
///
/// Placeholders naming a reference that has not been published yet are
/// returned unchanged; the resolver substitutes but never enforces order.
#[must_use]
pub fn resolve(value: &Value, id_map: &IdMap) -> Value {
    match value {
        Value::Object(map) => Value::Object(resolve_map(map, id_map)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, id_map)).collect()),
        Value::String(s) => parse_placeholder(s)
            .and_then(|reference| id_map.get(reference))
            .map_or_else(|| value.clone(), |id| Value::String(id.to_string())),
        _ => value.clone(),
    }
}

/// Resolves every value of a property map.
#[must_use]
pub fn resolve_map(map: &Map<String, Value>, id_map: &IdMap) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), resolve(v, id_map)))
        .collect()
}

/// Collects every placeholder reference in `value`, first occurrence first.
#[must_use]
pub fn collect_placeholders(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| walk(v, found)),
        Value::Array(items) => items.iter().for_each(|v| walk(v, found)),
        Value::String(s) => {
            if let Some(reference) = parse_placeholder(s) {
                if !found.iter().any(|f| f == reference) {
                    found.push(reference.to_string());
                }
            }
        }
        _ => {}
    }
}
