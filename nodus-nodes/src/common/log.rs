//! Log node.
//!
//! Writes every message through `tracing` and passes it on unchanged.

use crate::config::decode;
use nodus_core::config::EngineConfig;
use nodus_core::definition::Configuration;
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome};
use nodus_core::traits::{Component, ProcessFuture};
use serde::Deserialize;

/// Component type of [`LogNode`].
pub const LOG_TYPE: &str = "std::log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogConfig {
    #[serde(default = "default_level")]
    level: String,
    /// Prepended to every line.
    #[serde(default)]
    prefix: String,
}

fn default_level() -> String {
    "info".to_string()
}

/// Log node.
///
/// # Example Configuration
/// ```json
/// { "id": "log1", "type": "std::log", "configuration": { "level": "debug", "prefix": "[in]" } }
/// ```
#[derive(Debug, Default)]
pub struct LogNode {
    level: LogLevel,
    prefix: String,
}

impl LogNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Component for LogNode {
    fn component_type(&self) -> &str {
        LOG_TYPE
    }

    fn init(&mut self, _config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        let config: LogConfig = decode(configuration)?;
        self.level = LogLevel::parse(&config.level).ok_or_else(|| NodusError::ConfigValue {
            field: "level".to_string(),
            cause: format!("unknown level '{}'", config.level),
        })?;
        self.prefix = config.prefix;
        Ok(())
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        Box::pin(async move {
            let prefix = self.prefix.as_str();
            let id = msg.id.as_str();
            let msg_type = msg.msg_type.as_str();
            let data = msg.data.as_str();
            match self.level {
                LogLevel::Trace => tracing::trace!(msg_id = %id, msg_type = %msg_type, "{prefix}{data}"),
                LogLevel::Debug => tracing::debug!(msg_id = %id, msg_type = %msg_type, "{prefix}{data}"),
                LogLevel::Info => tracing::info!(msg_id = %id, msg_type = %msg_type, "{prefix}{data}"),
                LogLevel::Warn => tracing::warn!(msg_id = %id, msg_type = %msg_type, "{prefix}{data}"),
                LogLevel::Error => tracing::error!(msg_id = %id, msg_type = %msg_type, "{prefix}{data}"),
            }
            Ok(Outcome::success(msg))
        })
    }
}
