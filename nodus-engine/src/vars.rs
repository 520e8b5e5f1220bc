//! Bind-time variable resolution.
//!
//! Top-level string values of a node configuration may contain
//! `${scope.name}` placeholders. They are substituted once, when a node
//! context is built or reloaded:
//!
//! - `global`: process-wide [`Properties`]
//! - `vars`: the pipeline's `vars`, overlaid with its `decryptSecrets`
//! - `secrets`: the pipeline's `decryptSecrets` only
//!
//! A placeholder naming an unknown scope, an absent pipeline scope or a
//! missing key stays verbatim, so a configuration can be bound before its
//! scope is populated and bound again later.

use nodus_core::definition::Configuration;
use nodus_core::error::Result;
use nodus_core::properties::Properties;
use std::collections::HashMap;

pub use nodus_core::traits::PipelineScope;

/// Scope name for process-wide properties.
pub const GLOBAL_SCOPE: &str = "global";
/// Scope name for pipeline variables.
pub const VARS_SCOPE: &str = "vars";
/// Scope name for decrypted pipeline secrets.
pub const SECRETS_SCOPE: &str = "secrets";

type Scopes = HashMap<&'static str, HashMap<String, String>>;

/// Resolve `${scope.name}` placeholders in the top-level string values of `raw`.
///
/// Non-string values are copied unchanged. The only error is a scope
/// source that cannot be read.
pub fn resolve(
    properties: &Properties,
    pipeline: Option<&dyn PipelineScope>,
    raw: &Configuration,
) -> Result<Configuration> {
    let has_placeholder = raw
        .values()
        .any(|v| v.as_str().is_some_and(|s| s.contains("${")));
    if !has_placeholder {
        return Ok(raw.clone());
    }

    let scopes = collect_scopes(properties, pipeline)?;
    Ok(raw
        .iter()
        .map(|(key, value)| {
            let value = match value.as_str() {
                Some(s) => serde_json::Value::String(interpolate(s, &scopes)),
                None => value.clone(),
            };
            (key.clone(), value)
        })
        .collect())
}

fn collect_scopes(properties: &Properties, pipeline: Option<&dyn PipelineScope>) -> Result<Scopes> {
    let mut scopes = Scopes::new();
    scopes.insert(GLOBAL_SCOPE, properties.values());

    if let Some(pipeline) = pipeline {
        let secrets = pipeline.decrypt_secrets()?;
        let mut vars = pipeline.vars()?;
        vars.extend(secrets.iter().map(|(k, v)| (k.clone(), v.clone())));
        scopes.insert(VARS_SCOPE, vars);
        scopes.insert(SECRETS_SCOPE, secrets);
    }
    Ok(scopes)
}

/// Substitute every resolvable `${scope.name}` in `input`.
///
/// An unclosed `${` leaves the remainder of the string as written.
fn interpolate(input: &str, scopes: &Scopes) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_selector = false;
    let mut selector = String::new();

    while let Some(ch) = chars.next() {
        if !in_selector && ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            in_selector = true;
            selector.clear();
        } else if in_selector {
            if ch == '}' {
                match lookup(&selector, scopes) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("${");
                        result.push_str(&selector);
                        result.push('}');
                    }
                }
                in_selector = false;
            } else {
                selector.push(ch);
            }
        } else {
            result.push(ch);
        }
    }

    if in_selector {
        result.push_str("${");
        result.push_str(&selector);
    }
    result
}

fn lookup<'a>(selector: &str, scopes: &'a Scopes) -> Option<&'a str> {
    let (scope, name) = selector.trim().split_once('.')?;
    scopes
        .get(scope.trim())
        .and_then(|values| values.get(name.trim()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodus_core::NodusError;
    use serde_json::json;

    struct StaticScope {
        vars: HashMap<String, String>,
        secrets: HashMap<String, String>,
    }

    impl PipelineScope for StaticScope {
        fn vars(&self) -> Result<HashMap<String, String>> {
            Ok(self.vars.clone())
        }

        fn decrypt_secrets(&self) -> Result<HashMap<String, String>> {
            Ok(self.secrets.clone())
        }
    }

    struct BrokenScope;

    impl PipelineScope for BrokenScope {
        fn vars(&self) -> Result<HashMap<String, String>> {
            Err(NodusError::ScopeUnavailable {
                scope: VARS_SCOPE.to_string(),
                cause: "store offline".to_string(),
            })
        }

        fn decrypt_secrets(&self) -> Result<HashMap<String, String>> {
            Ok(HashMap::new())
        }
    }

    fn configuration(value: serde_json::Value) -> Configuration {
        value.as_object().cloned().unwrap()
    }

    fn pipeline_scope() -> StaticScope {
        StaticScope {
            vars: HashMap::from([("ip".to_string(), "127.0.0.1".to_string())]),
            secrets: HashMap::from([("bb".to_string(), "xx".to_string())]),
        }
    }

    #[test]
    fn global_scope_follows_properties() {
        let properties = Properties::new();
        let raw = configuration(json!({"name": "${global.name}"}));
        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result["name"], json!("${global.name}"));

        properties.put_value("name", "lala");
        let raw = configuration(json!({"name": "${global.name}", "age": 18}));
        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result["name"], json!("lala"));
        assert_eq!(result["age"], json!(18));

        let result = resolve(&Properties::new(), None, &raw).unwrap();
        assert_eq!(result["name"], json!("${global.name}"));
    }

    #[test]
    fn pipeline_scope_resolves_vars() {
        let properties = Properties::new();
        properties.put_value("name", "lala");
        let scope = pipeline_scope();
        let raw = configuration(json!({"name": "${global.name}", "ip": "${vars.ip}"}));

        let result = resolve(&properties, Some(&scope), &raw).unwrap();
        assert_eq!(result["name"], json!("lala"));
        assert_eq!(result["ip"], json!("127.0.0.1"));

        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result["ip"], json!("${vars.ip}"));
    }

    #[test]
    fn secrets_are_visible_in_both_scopes() {
        let scope = pipeline_scope();
        let raw = configuration(json!({"a": "${vars.bb}", "b": "${secrets.bb}", "c": "${secrets.ip}"}));
        let result = resolve(&Properties::new(), Some(&scope), &raw).unwrap();
        assert_eq!(result["a"], json!("xx"));
        assert_eq!(result["b"], json!("xx"));
        assert_eq!(result["c"], json!("${secrets.ip}"));
    }

    #[test]
    fn embedded_and_repeated_placeholders() {
        let properties = Properties::new();
        properties.put_value("host", "10.0.0.2");
        properties.put_value("port", "1883");
        let raw = configuration(json!({"server": "tcp://${global.host}:${ global.port }/${global.host}"}));
        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result["server"], json!("tcp://10.0.0.2:1883/10.0.0.2"));
    }

    #[test]
    fn malformed_placeholders_stay_verbatim() {
        let properties = Properties::new();
        properties.put_value("name", "lala");
        let raw = configuration(json!({
            "unclosed": "prefix ${global.name",
            "no_dot": "${name}",
            "unknown": "${env.name}",
            "ok": "${global.name} and $ sign",
        }));
        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result["unclosed"], json!("prefix ${global.name"));
        assert_eq!(result["no_dot"], json!("${name}"));
        assert_eq!(result["unknown"], json!("${env.name}"));
        assert_eq!(result["ok"], json!("lala and $ sign"));
    }

    #[test]
    fn nested_values_are_not_rewritten() {
        let properties = Properties::new();
        properties.put_value("name", "lala");
        let raw = configuration(json!({"nested": {"name": "${global.name}"}, "list": ["${global.name}"]}));
        let result = resolve(&properties, None, &raw).unwrap();
        assert_eq!(result, raw);
    }

    #[test]
    fn unreadable_scope_is_an_error() {
        let raw = configuration(json!({"ip": "${vars.ip}"}));
        let err = resolve(&Properties::new(), Some(&BrokenScope), &raw).unwrap_err();
        assert_eq!(err.code(), "E401");

        let raw = configuration(json!({"ip": "literal"}));
        assert!(resolve(&Properties::new(), Some(&BrokenScope), &raw).is_ok());
    }

    #[test]
    fn key_order_is_preserved() {
        let raw = configuration(json!({"z": "${global.a}", "a": 1, "m": "x"}));
        let result = resolve(&Properties::new(), None, &raw).unwrap();
        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
