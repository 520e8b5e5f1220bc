//! Messages flowing through a pipeline and the outcome of processing one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Payload encoding of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// JSON document.
    #[default]
    Json,
    /// Plain text.
    Text,
    /// Base64 or otherwise encoded binary.
    Binary,
}

impl DataType {
    /// Wire name of the data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
        }
    }
}

/// String metadata attached to a message.
pub type Metadata = HashMap<String, String>;

/// A message processed by nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message id.
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub ts: i64,
    /// Business type of the message (e.g. `TELEMETRY_MSG`).
    pub msg_type: String,
    /// Payload encoding.
    pub data_type: DataType,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Payload.
    pub data: String,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(msg_type: impl Into<String>, data_type: DataType, data: impl Into<String>) -> Self {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts,
            msg_type: msg_type.into(),
            data_type,
            metadata: Metadata::new(),
            data: data.into(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the per-message evaluation environment.
    ///
    /// JSON payloads are parsed into `msg`; anything else (or JSON that fails
    /// to parse) is exposed as the raw string. With `with_metadata` the
    /// metadata keys are also flattened into the top level.
    pub fn env(&self, with_metadata: bool) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::Value as Json;

        let msg = match self.data_type {
            DataType::Json => serde_json::from_str::<Json>(&self.data)
                .unwrap_or_else(|_| Json::String(self.data.clone())),
            _ => Json::String(self.data.clone()),
        };
        let metadata: serde_json::Map<String, Json> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Json::String(v.clone())))
            .collect();

        let mut env = serde_json::Map::new();
        env.insert("id".into(), Json::String(self.id.clone()));
        env.insert("ts".into(), Json::from(self.ts));
        env.insert("data".into(), Json::String(self.data.clone()));
        env.insert("msg".into(), msg);
        env.insert("metadata".into(), Json::Object(metadata.clone()));
        env.insert("msgType".into(), Json::String(self.msg_type.clone()));
        env.insert("type".into(), Json::String(self.msg_type.clone()));
        env.insert(
            "dataType".into(),
            Json::String(self.data_type.as_str().to_string()),
        );
        if with_metadata {
            env.extend(metadata);
        }
        env
    }
}

/// Relation a node reports after processing; the execution engine routes on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    Success,
    Failure,
    True,
    False,
    Custom(String),
}

impl Relation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::True => "True",
            Self::False => "False",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Relation to follow.
    pub relation: Relation,
    /// The (possibly transformed) message.
    pub message: Message,
}

impl Outcome {
    /// Outcome on the `Success` relation.
    pub fn success(message: Message) -> Self {
        Self {
            relation: Relation::Success,
            message,
        }
    }

    /// Outcome on an arbitrary relation.
    pub fn with_relation(relation: Relation, message: Message) -> Self {
        Self { relation, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parses_json_payload() {
        let msg = Message::new("TELEMETRY_MSG", DataType::Json, r#"{"temperature":35}"#)
            .with_metadata("productType", "test01");
        let env = msg.env(false);
        assert_eq!(env["msg"]["temperature"], 35);
        assert_eq!(env["metadata"]["productType"], "test01");
        assert_eq!(env["type"], "TELEMETRY_MSG");
        assert_eq!(env["dataType"], "JSON");
        assert!(!env.contains_key("productType"));

        let env = msg.env(true);
        assert_eq!(env["productType"], "test01");
    }

    #[test]
    fn env_keeps_invalid_json_as_text() {
        let msg = Message::new("RAW", DataType::Json, "not json");
        assert_eq!(msg.env(false)["msg"], "not json");
    }

    #[test]
    fn relation_display() {
        assert_eq!(Relation::Success.to_string(), "Success");
        assert_eq!(Relation::Custom("retry".into()).to_string(), "retry");
    }
}
