//! Engine configuration injected into node contexts and components.

use crate::error::{NodusError, Result};
use crate::parser::{DefinitionParser, JsonParser};
use crate::properties::Properties;
use crate::registry::ComponentRegistry;
use crate::traits::{NetPool, PipelineScope};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tunable engine settings.
///
/// ```yaml
/// properties:
///   region: eu-1
/// connect_timeout_ms: 3000
/// connect_wait_ms: 100
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Initial process-wide properties (`${global.*}`).
    pub properties: HashMap<String, String>,

    /// Upper bound for a single dial attempt in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long a caller that lost the connect race waits before re-checking.
    #[serde(default = "default_connect_wait_ms")]
    pub connect_wait_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_connect_wait_ms() -> u64 {
    200
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            properties: HashMap::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            connect_wait_ms: default_connect_wait_ms(),
        }
    }
}

impl EngineSettings {
    /// Parse settings from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| NodusError::ConfigValue {
            field: "settings".to_string(),
            cause: e.to_string(),
        })
    }

    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NodusError::ConfigValue {
            field: "settings".to_string(),
            cause: e.to_string(),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn connect_wait(&self) -> Duration {
        Duration::from_millis(self.connect_wait_ms)
    }
}

/// Everything a node context and its component need from the process.
///
/// Cheap to clone; all members are shared handles.
#[derive(Clone)]
pub struct EngineConfig {
    /// Component factories.
    pub registry: Arc<ComponentRegistry>,
    /// Definition decoder.
    pub parser: Arc<dyn DefinitionParser>,
    /// Process-wide properties.
    pub properties: Properties,
    /// Shared resource pool, if any.
    pub net_pool: Option<Arc<dyn NetPool>>,
    /// Variables of the enclosing pipeline, if any. Composites bind their
    /// children against it.
    pub scope: Option<Arc<dyn PipelineScope>>,
    /// Tunables.
    pub settings: EngineSettings,
}

impl EngineConfig {
    /// Create a config with an empty registry and the JSON parser.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ComponentRegistry::new()),
            parser: Arc::new(JsonParser),
            properties: Properties::new(),
            net_pool: None,
            scope: None,
            settings: EngineSettings::default(),
        }
    }

    /// Create a config from settings; `settings.properties` seeds the properties.
    pub fn from_settings(settings: EngineSettings) -> Self {
        Self {
            properties: Properties::from_map(settings.properties.clone()),
            settings,
            ..Self::new()
        }
    }

    pub fn with_registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn DefinitionParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_net_pool(mut self, net_pool: Arc<dyn NetPool>) -> Self {
        self.net_pool = Some(net_pool);
        self
    }

    pub fn with_scope(mut self, scope: Arc<dyn PipelineScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("registry", &self.registry)
            .field("properties", &self.properties)
            .field("net_pool", &self.net_pool.is_some())
            .field("scope", &self.scope.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let settings = EngineSettings::from_yaml("{}").unwrap();
        assert_eq!(settings.connect_timeout_ms, 5_000);
        assert_eq!(settings.connect_wait(), Duration::from_millis(200));
        assert!(settings.properties.is_empty());
    }

    #[test]
    fn settings_seed_properties() {
        let yaml = r#"
properties:
  name: lala
connect_timeout_ms: 1500
"#;
        let config = EngineConfig::from_settings(EngineSettings::from_yaml(yaml).unwrap());
        assert_eq!(config.properties.get_value("name").as_deref(), Some("lala"));
        assert_eq!(config.settings.connect_timeout(), Duration::from_millis(1500));
        assert!(config.net_pool.is_none());
        assert!(config.scope.is_none());
    }

    #[test]
    fn settings_from_json() {
        let settings = EngineSettings::from_json(r#"{"connect_wait_ms": 50}"#).unwrap();
        assert_eq!(settings.connect_wait_ms, 50);
        assert!(EngineSettings::from_json("[").is_err());
    }
}
