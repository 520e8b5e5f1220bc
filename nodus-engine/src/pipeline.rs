//! Pipeline scope and the node contexts of one pipeline.

use crate::node_ctx::NodeContext;
use crate::vars::PipelineScope;
use nodus_core::config::EngineConfig;
use nodus_core::definition::PipelineDefinition;
use nodus_core::error::{NodusError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// The `vars` and `decryptSecrets` declared by a pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineVars {
    vars: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl PipelineVars {
    pub fn new(vars: HashMap<String, String>, secrets: HashMap<String, String>) -> Self {
        Self { vars, secrets }
    }

    pub fn from_definition(definition: &PipelineDefinition) -> Self {
        Self::new(definition.vars(), definition.decrypt_secrets())
    }
}

impl PipelineScope for PipelineVars {
    fn vars(&self) -> Result<HashMap<String, String>> {
        Ok(self.vars.clone())
    }

    fn decrypt_secrets(&self) -> Result<HashMap<String, String>> {
        Ok(self.secrets.clone())
    }
}

/// Node contexts of one pipeline, bound against its variable scope.
///
/// Routing messages between the nodes is left to the execution engine.
pub struct PipelineContext {
    id: String,
    scope: Arc<PipelineVars>,
    nodes: Vec<Arc<NodeContext>>,
    index: HashMap<String, usize>,
}

impl PipelineContext {
    /// Build one node context per declared node.
    ///
    /// If any node fails, the ones already built are destroyed and the error
    /// is returned.
    pub fn new(config: EngineConfig, definition: &PipelineDefinition) -> Result<Self> {
        let scope = Arc::new(PipelineVars::from_definition(definition));
        let mut nodes: Vec<Arc<NodeContext>> = Vec::with_capacity(definition.metadata.nodes.len());
        let mut index = HashMap::new();

        for node in &definition.metadata.nodes {
            if index.contains_key(&node.id) {
                destroy_all(&nodes);
                return Err(NodusError::ConfigValue {
                    field: "metadata.nodes".to_string(),
                    cause: format!("duplicate node id {}", node.id),
                });
            }
            let dyn_scope: Arc<dyn PipelineScope> = scope.clone();
            match NodeContext::new(config.clone(), Some(dyn_scope), node.clone()) {
                Ok(ctx) => {
                    index.insert(node.id.clone(), nodes.len());
                    nodes.push(Arc::new(ctx));
                }
                Err(err) => {
                    destroy_all(&nodes);
                    return Err(err);
                }
            }
        }

        tracing::info!(
            pipeline_id = %definition.pipeline.id,
            nodes = nodes.len(),
            "Pipeline context initialized"
        );
        Ok(Self {
            id: definition.pipeline.id.clone(),
            scope,
            nodes,
            index,
        })
    }

    /// Decode `dsl` with the configured parser and build the context.
    pub fn from_dsl(config: EngineConfig, dsl: &[u8]) -> Result<Self> {
        let definition = config.parser.decode_pipeline(dsl)?;
        Self::new(config, &definition)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &Arc<PipelineVars> {
        &self.scope
    }

    /// The node declared under `id`.
    pub fn node(&self, id: &str) -> Option<Arc<NodeContext>> {
        self.index.get(id).map(|&i| Arc::clone(&self.nodes[i]))
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Arc<NodeContext>] {
        &self.nodes
    }

    /// Reload the node declared under `id`. Its declared id keeps addressing it.
    pub fn reload_child(&self, id: &str, dsl: &[u8]) -> Result<()> {
        let node = self.node(id).ok_or_else(|| NodusError::ChildNotFound {
            child_id: id.to_string(),
        })?;
        node.reload_self(dsl)
    }

    pub fn destroy(&self) {
        destroy_all(&self.nodes);
    }
}

fn destroy_all(nodes: &[Arc<NodeContext>]) {
    for node in nodes {
        node.destroy();
    }
}
