//! Process-lifetime tool result cache.
//!
//! Keys are (tool name, canonicalized arguments): JSON objects are
//! re-serialized with keys sorted at every nesting level, so argument
//! ordering differences from the model collapse onto one entry. The cache
//! is never cleared — it lives as long as the session, across user turns.

use serde_json::Value;
use std::collections::HashMap;

/// Cache of tool results keyed by (tool name, canonical argument string).
#[derive(Debug, Default)]
pub struct ToolCache {
    entries: HashMap<(String, String), String>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached result for this tool + argument combination.
    pub fn get(&self, tool: &str, args: &Value) -> Option<&str> {
        self.entries
            .get(&(tool.to_string(), canonicalize(args)))
            .map(String::as_str)
    }

    /// Store a result. Overwrites any previous entry for the same key.
    pub fn insert(&mut self, tool: &str, args: &Value, result: impl Into<String>) {
        self.entries
            .insert((tool.to_string(), canonicalize(args)), result.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize a JSON value with object keys sorted at every level.
fn canonicalize(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
                sorted.sort_by_key(|(k, _)| k.as_str());
                Value::Object(
                    sorted
                        .into_iter()
                        .map(|(k, v)| (k.clone(), sort(v)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    sort(value).to_string()
}
