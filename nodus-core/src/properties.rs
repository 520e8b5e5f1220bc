//! Process-wide properties, the `global` variable scope.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, mutable flat key-value store.
///
/// Cloning yields another handle to the same store. Reads see whatever is
/// current at call time.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`.
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    pub fn put_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Copy of every entry.
    pub fn values(&self) -> HashMap<String, String> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
