//! Group node (composite).
//!
//! Runs a fixed list of child nodes in order, feeding each one the message
//! produced by the previous one. Children can be reloaded one at a time
//! through [`Composite::reload_child`].
//!
//! Children bind against the scope carried by the group's config, so a
//! group inside a pipeline resolves `${vars.*}` and `${secrets.*}` in its
//! children the same way the pipeline does for its own nodes.

use crate::config::decode;
use nodus_core::config::EngineConfig;
use nodus_core::definition::{Configuration, NodeDefinition};
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome, Relation};
use nodus_core::traits::{Component, Composite, ProcessFuture};
use nodus_engine::NodeContext;
use serde::Deserialize;
use std::sync::Arc;

/// Component type of [`GroupNode`].
pub const GROUP_TYPE: &str = "std::group";

#[derive(Debug, Deserialize)]
struct GroupConfig {
    nodes: Vec<NodeDefinition>,
}

struct Child {
    declared_id: String,
    ctx: Arc<NodeContext>,
}

/// Group node.
///
/// A child returning an error or the `Failure` relation stops the group;
/// that outcome is returned as is.
///
/// # Example Configuration
/// ```json
/// {
///   "id": "g1",
///   "type": "std::group",
///   "configuration": {
///     "nodes": [
///       { "id": "log", "type": "std::log" },
///       { "id": "push", "type": "net::tcp_client", "configuration": { "server": "ref://tcp01" } }
///     ]
///   }
/// }
/// ```
#[derive(Default)]
pub struct GroupNode {
    children: Vec<Child>,
}

impl GroupNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// The child declared under `id`.
    pub fn child(&self, id: &str) -> Option<Arc<NodeContext>> {
        self.children
            .iter()
            .find(|c| c.declared_id == id)
            .map(|c| Arc::clone(&c.ctx))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Component for GroupNode {
    fn component_type(&self) -> &str {
        GROUP_TYPE
    }

    fn init(&mut self, config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        let group: GroupConfig = decode(configuration)?;
        let mut children: Vec<Child> = Vec::with_capacity(group.nodes.len());

        for definition in group.nodes {
            if children.iter().any(|c| c.declared_id == definition.id) {
                children.iter().for_each(|c| c.ctx.destroy());
                return Err(NodusError::ConfigValue {
                    field: "nodes".to_string(),
                    cause: format!("duplicate child id {}", definition.id),
                });
            }
            let declared_id = definition.id.clone();
            match NodeContext::new(config.clone(), config.scope.clone(), definition) {
                Ok(ctx) => children.push(Child {
                    declared_id,
                    ctx: Arc::new(ctx),
                }),
                Err(err) => {
                    children.iter().for_each(|c| c.ctx.destroy());
                    return Err(err);
                }
            }
        }

        self.children = children;
        Ok(())
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        Box::pin(async move {
            let mut current = msg;
            for child in &self.children {
                let outcome = child.ctx.process(current).await?;
                if outcome.relation == Relation::Failure {
                    return Ok(outcome);
                }
                current = outcome.message;
            }
            Ok(Outcome::success(current))
        })
    }

    fn destroy(&self) {
        for child in &self.children {
            child.ctx.destroy();
        }
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Composite for GroupNode {
    fn reload_child(&self, child_id: &str, dsl: &[u8]) -> Result<()> {
        let child = self.child(child_id).ok_or_else(|| NodusError::ChildNotFound {
            child_id: child_id.to_string(),
        })?;
        child.reload_self(dsl)
    }
}
