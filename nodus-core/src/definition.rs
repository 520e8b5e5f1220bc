//! Declarative definitions for nodes and pipelines.
//!
//! # Example
//!
//! ```json
//! {
//!   "id": "my_tcp_client",
//!   "type": "net::tcp_client",
//!   "name": "push telemetry",
//!   "debugMode": false,
//!   "configuration": {
//!     "server": "127.0.0.1:1883"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered configuration mapping of a node.
pub type Configuration = serde_json::Map<String, serde_json::Value>;

/// Configuration key holding pipeline variables.
pub const VARS_KEY: &str = "vars";

/// Configuration key holding already decrypted pipeline secrets.
pub const DECRYPT_SECRETS_KEY: &str = "decryptSecrets";

/// A node definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Node id, unique within its enclosing scope.
    #[serde(default)]
    pub id: String,

    /// Component type, the registry key.
    #[serde(rename = "type")]
    pub node_type: String,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether debug callbacks are enabled for this node.
    #[serde(default)]
    pub debug_mode: bool,

    /// Component-specific configuration.
    #[serde(default)]
    pub configuration: Configuration,
}

impl NodeDefinition {
    /// Create a new node definition.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enable debug mode.
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Replace the whole configuration.
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Set a single configuration entry.
    pub fn with_config(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Get a string configuration value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(|v| v.as_str())
    }
}

/// Header of a pipeline document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    /// Pipeline id.
    #[serde(default)]
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Debug mode for every node of the pipeline.
    #[serde(default)]
    pub debug_mode: bool,

    /// Whether this is a root pipeline.
    #[serde(default)]
    pub root: bool,

    /// Pipeline-level configuration (`vars`, `decryptSecrets`, ...).
    #[serde(default)]
    pub configuration: Configuration,
}

/// Node list of a pipeline document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Declared nodes, in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// A pipeline definition.
///
/// ```json
/// {
///   "pipeline": {
///     "id": "telemetry",
///     "configuration": {
///       "vars": { "ip": "127.0.0.1" },
///       "decryptSecrets": { "token": "xx" }
///     }
///   },
///   "metadata": { "nodes": [] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline header.
    pub pipeline: PipelineInfo,

    /// Declared nodes.
    #[serde(default)]
    pub metadata: PipelineMetadata,
}

impl PipelineDefinition {
    /// Pipeline variables declared under `configuration.vars`.
    pub fn vars(&self) -> HashMap<String, String> {
        string_map(self.pipeline.configuration.get(VARS_KEY))
    }

    /// Decrypted secrets declared under `configuration.decryptSecrets`.
    pub fn decrypt_secrets(&self) -> HashMap<String, String> {
        string_map(self.pipeline.configuration.get(DECRYPT_SECRETS_KEY))
    }
}

/// Flatten a JSON object into string values; non-string scalars use their JSON text.
fn string_map(value: Option<&serde_json::Value>) -> HashMap<String, String> {
    let Some(obj) = value.and_then(|v| v.as_object()) else {
        return HashMap::new();
    };
    obj.iter()
        .map(|(k, v)| {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_node() {
        let json = r#"{
            "id": "my_tcp_client",
            "type": "net::tcp_client",
            "name": "push",
            "debugMode": true,
            "configuration": { "server": "127.0.0.1:1883", "retries": 3 }
        }"#;
        let node: NodeDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, "my_tcp_client");
        assert_eq!(node.node_type, "net::tcp_client");
        assert!(node.debug_mode);
        assert_eq!(node.get_string("server"), Some("127.0.0.1:1883"));
        assert_eq!(node.configuration["retries"], 3);
    }

    #[test]
    fn configuration_keeps_declaration_order() {
        let json = r#"{"type": "std::log", "configuration": {"z": 1, "a": 2, "m": 3}}"#;
        let node: NodeDefinition = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = node.configuration.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn node_builder() {
        let node = NodeDefinition::new("s1", "std::log")
            .with_name("logger")
            .with_config("level", "debug");
        assert_eq!(node.name.as_deref(), Some("logger"));
        assert_eq!(node.get_string("level"), Some("debug"));
        assert!(!node.debug_mode);
    }

    #[test]
    fn pipeline_scope_maps() {
        let json = r#"{
            "pipeline": {
                "id": "test01",
                "root": true,
                "configuration": {
                    "vars": { "ip": "127.0.0.1", "port": 1883 },
                    "decryptSecrets": { "bb": "xx" }
                }
            }
        }"#;
        let def: PipelineDefinition = serde_json::from_str(json).unwrap();
        assert!(def.pipeline.root);
        assert!(def.metadata.nodes.is_empty());
        let vars = def.vars();
        assert_eq!(vars.get("ip").map(String::as_str), Some("127.0.0.1"));
        assert_eq!(vars.get("port").map(String::as_str), Some("1883"));
        assert_eq!(
            def.decrypt_secrets().get("bb").map(String::as_str),
            Some("xx")
        );
    }
}
