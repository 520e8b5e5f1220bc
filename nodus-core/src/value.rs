//! Dynamic value with dotted-path field access.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Wraps `serde_json::Value` to provide path lookups and comparisons
/// used by condition-evaluating components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Get a field by path.
    ///
    /// Supports `field`, `parent.child`, a `$.` prefix and `items[0]` indexing.
    pub fn get_field(&self, path: &str) -> Option<Value> {
        let path = path.strip_prefix("$.").unwrap_or(path);

        let mut current = &self.0;
        for part in path.split('.') {
            if let Some((field, idx_str)) = part.split_once('[') {
                if !field.is_empty() {
                    current = current.get(field)?;
                }
                let idx: usize = idx_str.strip_suffix(']')?.parse().ok()?;
                current = current.get(idx)?;
            } else {
                current = current.get(part)?;
            }
        }
        Some(Value(current.clone()))
    }

    /// Convert to string if possible.
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Convert to f64 if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Loose equality: numeric when both sides are numbers, textual otherwise.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => self.as_string() == other.as_string(),
        }
    }

    /// Access the inner JSON value.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}
