//! State normalizer: the canonical text form of everything written to the
//! durable store.
//!
//! Two passes over the JSON tree:
//! 1. strip attributes equal to a declared default (plus nulls and empty
//!    collections when enabled)
//! 2. sort every object's keys lexicographically
//!
//! `normalize(normalize(v)) == normalize(v)` holds for any value, and a
//! write/read/write cycle of a graph produces byte-identical text.

use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An attribute that is dropped when it holds its default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRule {
    /// Key of the enclosing collection (`nodes`, `edges`, ...). `None`
    /// applies the rule at any depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,
    pub key: String,
    pub value: Value,
}

impl DefaultRule {
    pub fn new(within: &str, key: &str, value: impl Into<Value>) -> Self {
        Self {
            within: Some(within.to_string()),
            key: key.to_string(),
            value: value.into(),
        }
    }

    fn matches(&self, context: Option<&str>, key: &str, value: &Value) -> bool {
        if self.key != key {
            return false;
        }
        if let Some(within) = &self.within {
            if context != Some(within.as_str()) {
                return false;
            }
        }
        same_value(&self.value, value)
    }
}

/// Which attributes the normalizer strips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeRules {
    pub defaults: Vec<DefaultRule>,
    pub strip_nulls: bool,
    pub strip_empty: bool,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            defaults: vec![
                DefaultRule::new("nodes", "status", "active"),
                DefaultRule::new("nodes", "pinned", false),
                DefaultRule::new("edges", "kind", "dependency"),
                DefaultRule::new("edges", "approval", "approved"),
                DefaultRule::new("edges", "weight", 1.0),
                DefaultRule::new("edges", "volatile", false),
                DefaultRule::new("clusters", "collapsed", false),
                DefaultRule::new("clusters", "role", "user"),
            ],
            strip_nulls: true,
            strip_empty: true,
        }
    }
}

impl NormalizeRules {
    pub fn validate(&self) -> Result<()> {
        for rule in &self.defaults {
            if rule.key.trim().is_empty() {
                return Err(EngineError::invalid_config(
                    "normalize default rule has an empty key",
                ));
            }
            if rule.value.is_array() || rule.value.is_object() {
                return Err(EngineError::invalid_config(format!(
                    "normalize default for `{}` must be a scalar",
                    rule.key
                )));
            }
        }
        Ok(())
    }

    /// Strip defaults, then sort keys
    pub fn normalize(&self, value: &Value) -> Value {
        let mut value = value.clone();
        self.strip(&mut value, None);
        sort_keys(value)
    }

    /// Serialize, normalize and render as pretty JSON with a trailing newline
    pub fn to_canonical_string<T: Serialize>(&self, state: &T) -> Result<String> {
        let value = serde_json::to_value(state)?;
        let mut text = serde_json::to_string_pretty(&self.normalize(&value))?;
        text.push('\n');
        Ok(text)
    }

    fn strip(&self, value: &mut Value, context: Option<&str>) {
        match value {
            Value::Object(map) => {
                let keys: Vec<String> = map.keys().cloned().collect();
                for key in keys {
                    let remove = match map.get_mut(&key) {
                        Some(child) => {
                            self.strip(child, Some(key.as_str()));
                            self.is_noise(context, &key, child)
                        }
                        None => false,
                    };
                    if remove {
                        map.remove(&key);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.strip(item, context);
                }
            }
            _ => {}
        }
    }

    fn is_noise(&self, context: Option<&str>, key: &str, value: &Value) -> bool {
        match value {
            Value::Null => return self.strip_nulls,
            Value::Array(items) if items.is_empty() => return self.strip_empty,
            Value::Object(map) if map.is_empty() => return self.strip_empty,
            _ => {}
        }
        self.defaults
            .iter()
            .any(|rule| rule.matches(context, key, value))
    }
}

fn same_value(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => expected == actual,
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, child) in entries {
                sorted.insert(key, sort_keys(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
