//! Values handling with deep merge support
//!
//! The values document is a YAML mapping whose root keys double as
//! enablement switches for templates. Internally it is a `serde_json::Value`,
//! a tagged union over strings, numbers, bools, null, sequences and mappings.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse_yaml(yaml, "<inline>")
    }

    /// Wrap an already-parsed document, enforcing a mapping root
    pub fn from_value(value: JsonValue, source: &str) -> Result<Self> {
        match value {
            JsonValue::Object(_) => Ok(Self(value)),
            JsonValue::Null => Ok(Self::new()),
            other => Err(CoreError::parse(
                source,
                format!(
                    "values document must be a mapping at the root, got {}",
                    kind_name(&other)
                ),
            )),
        }
    }

    /// Anchors are expanded and `<<` merge keys applied; explicit tags such
    /// as `!secret x` are dropped and the tagged value kept as is.
    fn parse_yaml(yaml: &str, source: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        let mut doc: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::parse(source, e))?;
        doc.apply_merge().map_err(|e| CoreError::parse(source, e))?;

        let value =
            serde_json::to_value(strip_tags(doc)).map_err(|e| CoreError::parse(source, e))?;
        Self::from_value(value, source)
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g., "network.cidr")
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        set_nested(&mut self.0, &parts, value)
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Whether a top-level key is declared, regardless of its value
    ///
    /// `false`, `null` and empty collections all count as present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0
            .as_object()
            .is_some_and(|map| map.contains_key(key))
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<&str> {
        self.0
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

fn strip_tags(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Tagged(tagged) => strip_tags(tagged.value),
        Yaml::Sequence(items) => Yaml::Sequence(items.into_iter().map(strip_tags).collect()),
        Yaml::Mapping(map) => Yaml::Mapping(
            map.into_iter()
                .map(|(k, v)| (strip_tags(k), strip_tags(v)))
                .collect(),
        ),
        other => other,
    }
}

fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path
fn set_nested(value: &mut JsonValue, path: &[&str], new_value: JsonValue) -> Result<()> {
    let Some((key, remaining)) = path.split_first() else {
        *value = new_value;
        return Ok(());
    };

    if key.is_empty() {
        return Err(CoreError::ValuesMerge {
            message: "empty path segment".to_string(),
        });
    }

    if !value.is_object() {
        *value = JsonValue::Object(serde_json::Map::new());
    }

    let JsonValue::Object(map) = value else {
        unreachable!("value was just replaced by an object");
    };

    if remaining.is_empty() {
        map.insert(key.to_string(), new_value);
    } else {
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        set_nested(entry, remaining, new_value)?;
    }

    Ok(())
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let Some((key, remaining)) = path.split_first() else {
        return Some(value);
    };

    match value {
        JsonValue::Object(map) => map.get(*key).and_then(|v| get_nested(v, remaining)),
        JsonValue::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx))
            .and_then(|v| get_nested(v, remaining)),
        _ => None,
    }
}

/// Parse --set arguments (key=value format)
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;

        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if let Some(num) = val
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            JsonValue::Number(num)
        } else if val.starts_with('[') || val.starts_with('{') {
            serde_json::from_str(val).unwrap_or_else(|_| JsonValue::String(val.to_string()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set(key, json_value)?;
    }

    Ok(values)
}
