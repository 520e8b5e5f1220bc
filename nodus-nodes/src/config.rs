//! Typed decoding of component configuration.

use nodus_core::definition::Configuration;
use nodus_core::error::{NodusError, Result};
use serde::de::DeserializeOwned;

/// Decode `configuration` into `T`. Unknown keys are ignored.
pub(crate) fn decode<T: DeserializeOwned>(configuration: &Configuration) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(configuration.clone())).map_err(|e| {
        NodusError::ConfigValue {
            field: "configuration".to_string(),
            cause: e.to_string(),
        }
    })
}
