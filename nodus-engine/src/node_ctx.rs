//! Node context: a stable handle over a hot-swappable component.
//!
//! The definition and the live instance are published together as one
//! [`NodeState`] behind an [`ArcSwap`]. A reload builds and initializes the
//! replacement off to the side and swaps it in only on success, so readers
//! observe either the complete old pair or the complete new pair.

use crate::vars::{PipelineScope, resolve};
use arc_swap::ArcSwap;
use nodus_core::config::EngineConfig;
use nodus_core::definition::NodeDefinition;
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome};
use nodus_core::net_resource::INIT_NET_RESOURCE_KEY;
use nodus_core::traits::{Component, SharedResource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a context requires from the components it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Any registered component.
    Plain,
    /// Only connection-bearing components; the pool marker is injected.
    NetResource,
}

/// A definition together with the instance built from it.
pub struct NodeState {
    definition: NodeDefinition,
    component: Arc<dyn Component>,
    destroyed: AtomicBool,
}

impl NodeState {
    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            self.component.destroy();
        }
    }
}

/// Owns one component instance and its current definition.
pub struct NodeContext {
    /// Carries the pipeline scope the context binds against.
    config: EngineConfig,
    binding: Binding,
    state: ArcSwap<NodeState>,
    /// Serializes reload and destroy; readers never take it.
    lifecycle: Mutex<()>,
}

impl NodeContext {
    /// Build a context: resolve variables, instantiate and initialize.
    ///
    /// `scope` replaces any scope already carried by `config`; the component
    /// receives the resulting config in `init`.
    ///
    /// Fails with `ComponentNotFound` for an unregistered type and with
    /// `ComponentInit` when the component rejects its configuration.
    pub fn new(
        config: EngineConfig,
        scope: Option<Arc<dyn PipelineScope>>,
        definition: NodeDefinition,
    ) -> Result<Self> {
        Self::with_binding(config, scope, definition, Binding::Plain)
    }

    pub(crate) fn with_binding(
        config: EngineConfig,
        scope: Option<Arc<dyn PipelineScope>>,
        definition: NodeDefinition,
        binding: Binding,
    ) -> Result<Self> {
        let config = match scope {
            Some(scope) => config.with_scope(scope),
            None => config,
        };
        let state = build(&config, definition, binding)?;
        tracing::debug!(
            node_id = %state.definition.id,
            node_type = %state.definition.node_type,
            "Node context initialized"
        );
        Ok(Self {
            config,
            binding,
            state: ArcSwap::from_pointee(state),
            lifecycle: Mutex::new(()),
        })
    }

    /// Current definition and instance, as one consistent snapshot.
    pub fn state(&self) -> Arc<NodeState> {
        self.state.load_full()
    }

    /// Copy of the current definition.
    pub fn definition(&self) -> NodeDefinition {
        self.state.load().definition.clone()
    }

    pub fn id(&self) -> String {
        self.state.load().definition.id.clone()
    }

    pub fn node_type(&self) -> String {
        self.state.load().definition.node_type.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a message with the instance current at call time.
    pub async fn process(&self, msg: Message) -> Result<Outcome> {
        let state = self.state.load_full();
        state.component.process(msg).await
    }

    /// The connection of a connection-bearing component.
    pub fn net_resource(&self) -> Result<SharedResource> {
        let state = self.state.load();
        match state.component.as_net_resource() {
            Some(resource) => resource.net_resource(),
            None => Err(NodusError::NotNetResource {
                component_type: state.definition.node_type.clone(),
            }),
        }
    }

    /// Replace the definition and instance with ones decoded from `dsl`.
    ///
    /// On any failure the current pair stays in place.
    pub fn reload_self(&self, dsl: &[u8]) -> Result<()> {
        let definition = self.config.parser.decode_node(dsl)?;
        self.reload_definition(definition)
    }

    /// Replace the definition and instance with ones built from `definition`.
    ///
    /// A destroyed context stays destroyed: the reload is refused with
    /// `UnsupportedOperation` and nothing is built.
    pub fn reload_definition(&self, definition: NodeDefinition) -> Result<()> {
        let _span = crate::node_span!(definition.id, definition.node_type, "reload").entered();
        let _lifecycle = self.lifecycle.lock();
        {
            let current = self.state.load();
            if current.destroyed.load(Ordering::Acquire) {
                return Err(NodusError::UnsupportedOperation {
                    operation: "reload_self",
                    component_type: current.definition.node_type.clone(),
                });
            }
        }
        let fresh = build(&self.config, definition, self.binding)?;
        tracing::info!(
            node_id = %fresh.definition.id,
            node_type = %fresh.definition.node_type,
            "Node reloaded"
        );
        let old = self.state.swap(Arc::new(fresh));
        old.destroy();
        Ok(())
    }

    /// Reload one child of a composite component.
    ///
    /// Leaf components return `UnsupportedOperation`.
    pub fn reload_child(&self, child_id: &str, dsl: &[u8]) -> Result<()> {
        let state = self.state.load_full();
        match state.component.as_composite() {
            Some(composite) => composite.reload_child(child_id, dsl),
            None => Err(NodusError::UnsupportedOperation {
                operation: "reload_child",
                component_type: state.definition.node_type.clone(),
            }),
        }
    }

    /// Destroy the current instance. Repeated calls are no-ops.
    pub fn destroy(&self) {
        let _lifecycle = self.lifecycle.lock();
        let state = self.state.load();
        if !state.destroyed.load(Ordering::Acquire) {
            tracing::debug!(
                node_id = %state.definition.id,
                node_type = %state.definition.node_type,
                "Destroying node"
            );
        }
        state.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.load().destroyed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("NodeContext")
            .field("id", &state.definition.id)
            .field("node_type", &state.definition.node_type)
            .field("binding", &self.binding)
            .finish()
    }
}

fn build(
    config: &EngineConfig,
    mut definition: NodeDefinition,
    binding: Binding,
) -> Result<NodeState> {
    let mut component = config
        .registry
        .new_component(&definition.node_type, &definition.id)?;

    if binding == Binding::NetResource {
        if component.as_net_resource().is_none() {
            return Err(NodusError::NotNetResource {
                component_type: definition.node_type,
            });
        }
        definition
            .configuration
            .insert(INIT_NET_RESOURCE_KEY.to_string(), serde_json::Value::Bool(true));
    }

    let resolved = resolve(&config.properties, config.scope.as_deref(), &definition.configuration)?;
    component
        .init(config, &resolved)
        .map_err(|source| NodusError::ComponentInit {
            node_id: definition.id.clone(),
            component_type: definition.node_type.clone(),
            source: Box::new(source),
        })?;

    Ok(NodeState {
        definition,
        component: Arc::from(component),
        destroyed: AtomicBool::new(false),
    })
}
