//! Filter node.
//!
//! Compares one field of the message environment with a constant and
//! reports `True` or `False`.

use crate::config::decode;
use nodus_core::config::EngineConfig;
use nodus_core::definition::Configuration;
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome, Relation};
use nodus_core::traits::{Component, ProcessFuture};
use nodus_core::value::Value;
use serde::Deserialize;

/// Component type of [`FilterNode`].
pub const FILTER_TYPE: &str = "std::filter";

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    #[default]
    Eq,
    Ne,
    Gt,
    Lt,
}

#[derive(Debug, Deserialize)]
struct FilterConfig {
    field: String,
    #[serde(default)]
    op: FilterOp,
    value: serde_json::Value,
}

/// Filter node.
///
/// `field` is a path into the message environment: `msg.temperature`,
/// `metadata.productType`, `msgType`, or a bare metadata key.
///
/// # Example Configuration
/// ```json
/// {
///   "id": "hot",
///   "type": "std::filter",
///   "configuration": { "field": "msg.temperature", "op": "gt", "value": 30 }
/// }
/// ```
#[derive(Debug, Default)]
pub struct FilterNode {
    field: String,
    op: FilterOp,
    expected: Value,
}

impl FilterNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn evaluate(&self, msg: &Message) -> bool {
        let env = Value(serde_json::Value::Object(msg.env(true)));
        let Some(actual) = env.get_field(&self.field) else {
            return self.op == FilterOp::Ne;
        };
        let result = match self.op {
            FilterOp::Eq => actual.loosely_equals(&self.expected),
            FilterOp::Ne => !actual.loosely_equals(&self.expected),
            FilterOp::Gt => compare(&actual, &self.expected, |a, b| a > b),
            FilterOp::Lt => compare(&actual, &self.expected, |a, b| a < b),
        };
        tracing::debug!(
            field = %self.field,
            op = ?self.op,
            result = result,
            "Evaluated filter condition"
        );
        result
    }
}

fn compare(actual: &Value, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

impl Component for FilterNode {
    fn component_type(&self) -> &str {
        FILTER_TYPE
    }

    fn init(&mut self, _config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        let config: FilterConfig = decode(configuration)?;
        if config.field.trim().is_empty() {
            return Err(NodusError::ConfigValue {
                field: "field".to_string(),
                cause: "must not be empty".to_string(),
            });
        }
        self.field = config.field;
        self.op = config.op;
        self.expected = Value(config.value);
        Ok(())
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        Box::pin(async move {
            let relation = if self.evaluate(&msg) {
                Relation::True
            } else {
                Relation::False
            };
            Ok(Outcome::with_relation(relation, msg))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodus_core::DataType;
    use serde_json::json;

    fn filter(configuration: serde_json::Value) -> FilterNode {
        let mut node = FilterNode::new();
        node.init(&EngineConfig::new(), configuration.as_object().unwrap())
            .unwrap();
        node
    }

    fn telemetry(temperature: i64) -> Message {
        Message::new(
            "TELEMETRY_MSG",
            DataType::Json,
            json!({"temperature": temperature}).to_string(),
        )
        .with_metadata("productType", "test01")
    }

    #[tokio::test]
    async fn numeric_comparisons() {
        let gt = filter(json!({"field": "msg.temperature", "op": "gt", "value": 30}));
        assert_eq!(gt.process(telemetry(35)).await.unwrap().relation, Relation::True);
        assert_eq!(gt.process(telemetry(20)).await.unwrap().relation, Relation::False);

        let lt = filter(json!({"field": "$.msg.temperature", "op": "lt", "value": "30"}));
        assert_eq!(lt.process(telemetry(20)).await.unwrap().relation, Relation::True);
    }

    #[tokio::test]
    async fn metadata_equality() {
        let eq = filter(json!({"field": "productType", "value": "test01"}));
        assert_eq!(eq.process(telemetry(1)).await.unwrap().relation, Relation::True);

        let ne = filter(json!({"field": "metadata.productType", "op": "ne", "value": "test01"}));
        assert_eq!(ne.process(telemetry(1)).await.unwrap().relation, Relation::False);
    }

    #[tokio::test]
    async fn missing_field() {
        let eq = filter(json!({"field": "msg.humidity", "op": "eq", "value": 1}));
        assert_eq!(eq.process(telemetry(1)).await.unwrap().relation, Relation::False);
        let ne = filter(json!({"field": "msg.humidity", "op": "ne", "value": 1}));
        assert_eq!(ne.process(telemetry(1)).await.unwrap().relation, Relation::True);
    }

    #[test]
    fn invalid_configuration() {
        let mut node = FilterNode::new();
        let config = EngineConfig::new();
        assert!(node.init(&config, json!({"field": "a"}).as_object().unwrap()).is_err());
        assert!(node
            .init(&config, json!({"field": " ", "value": 1}).as_object().unwrap())
            .is_err());
        assert!(node
            .init(&config, json!({"field": "a", "op": "between", "value": 1}).as_object().unwrap())
            .is_err());
    }
}
