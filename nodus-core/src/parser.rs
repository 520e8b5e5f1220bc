//! Definition decoders.

use crate::definition::{NodeDefinition, PipelineDefinition};
use crate::error::{NodusError, Result};

/// Decodes definition documents into typed definitions.
pub trait DefinitionParser: Send + Sync {
    /// Decode a single node definition.
    fn decode_node(&self, dsl: &[u8]) -> Result<NodeDefinition>;

    /// Decode a pipeline definition.
    fn decode_pipeline(&self, dsl: &[u8]) -> Result<PipelineDefinition>;
}

/// JSON definition decoder (the default).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl DefinitionParser for JsonParser {
    fn decode_node(&self, dsl: &[u8]) -> Result<NodeDefinition> {
        serde_json::from_slice(dsl).map_err(|e| NodusError::DefinitionDecode {
            cause: e.to_string(),
        })
    }

    fn decode_pipeline(&self, dsl: &[u8]) -> Result<PipelineDefinition> {
        serde_json::from_slice(dsl).map_err(|e| NodusError::DefinitionDecode {
            cause: e.to_string(),
        })
    }
}

/// YAML definition decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlParser;

impl DefinitionParser for YamlParser {
    fn decode_node(&self, dsl: &[u8]) -> Result<NodeDefinition> {
        serde_yaml::from_slice(dsl).map_err(|e| NodusError::DefinitionDecode {
            cause: e.to_string(),
        })
    }

    fn decode_pipeline(&self, dsl: &[u8]) -> Result<PipelineDefinition> {
        serde_yaml::from_slice(dsl).map_err(|e| NodusError::DefinitionDecode {
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_decode_node() {
        let def = JsonParser
            .decode_node(br#"{"id":"s2","type":"std::filter"}"#)
            .unwrap();
        assert_eq!(def.id, "s2");
        assert_eq!(def.node_type, "std::filter");
        assert!(def.configuration.is_empty());
    }

    #[test]
    fn json_decode_error() {
        let err = JsonParser.decode_node(b"{").unwrap_err();
        assert_eq!(err.code(), "E102");
    }

    #[test]
    fn json_missing_type_is_decode_error() {
        assert!(JsonParser.decode_node(br#"{"id":"s1"}"#).is_err());
    }

    #[test]
    fn yaml_decode_node() {
        let yaml = br#"
id: s1
type: std::log
debugMode: true
configuration:
  level: warn
  repeat: 2
"#;
        let def = YamlParser.decode_node(yaml).unwrap();
        assert_eq!(def.node_type, "std::log");
        assert!(def.debug_mode);
        assert_eq!(def.get_string("level"), Some("warn"));
        assert_eq!(def.configuration["repeat"], 2);
    }

    #[test]
    fn yaml_decode_pipeline() {
        let yaml = br#"
pipeline:
  id: p1
  configuration:
    vars:
      ip: 10.0.0.1
metadata:
  nodes:
    - id: n1
      type: std::log
"#;
        let def = YamlParser.decode_pipeline(yaml).unwrap();
        assert_eq!(def.pipeline.id, "p1");
        assert_eq!(def.metadata.nodes.len(), 1);
        assert_eq!(def.vars().get("ip").map(String::as_str), Some("10.0.0.1"));
    }
}
