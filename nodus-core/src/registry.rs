//! Component registry: maps a type name to the factory producing it.

use crate::error::{NodusError, Result};
use crate::traits::{Component, ComponentFactory, FnFactory};
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe registry of component factories keyed by component type.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: DashMap<String, Arc<dyn ComponentFactory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous one for the same type.
    pub fn register(&self, factory: Arc<dyn ComponentFactory>) {
        let component_type = factory.component_type().to_string();
        tracing::debug!(component_type = %component_type, "Component registered");
        self.factories.insert(component_type, factory);
    }

    /// Register a closure as the factory for `component_type`.
    pub fn register_fn<F>(&self, component_type: impl Into<String>, create: F)
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnFactory::new(component_type, create)));
    }

    /// Remove a factory. Returns whether one was registered.
    pub fn unregister(&self, component_type: &str) -> bool {
        self.factories.remove(component_type).is_some()
    }

    /// Look up the factory for a component type.
    pub fn lookup(&self, component_type: &str) -> Option<Arc<dyn ComponentFactory>> {
        self.factories
            .get(component_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, component_type: &str) -> bool {
        self.factories.contains_key(component_type)
    }

    /// All registered component types, sorted.
    pub fn component_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Create a fresh, uninitialized instance for `node_id`.
    pub fn new_component(&self, component_type: &str, node_id: &str) -> Result<Box<dyn Component>> {
        self.lookup(component_type)
            .map(|factory| factory.create())
            .ok_or_else(|| NodusError::ComponentNotFound {
                component_type: component_type.to_string(),
                node_id: node_id.to_string(),
            })
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("component_types", &self.component_types())
            .finish()
    }
}
