//! Test doubles for code built on nodus.
//!
//! The doubles count their lifecycle calls in a shared [`MockCounters`], so
//! a test can assert how many instances were built, initialized and
//! destroyed without reaching into the engine.
//!
//! # Example
//!
//! ```ignore
//! use nodus_core::testing::{test_registry, MOCK_TYPE};
//!
//! let (registry, counters) = test_registry();
//! let component = registry.new_component(MOCK_TYPE, "n1").unwrap();
//! assert_eq!(counters.created(), 1);
//! ```

use crate::config::EngineConfig;
use crate::definition::Configuration;
use crate::error::{NodusError, Result};
use crate::message::{Message, Outcome};
use crate::registry::ComponentRegistry;
use crate::traits::{Component, Composite, NetResource, ProcessFuture, SharedResource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Component type of [`MockComponent`] in [`test_registry`].
pub const MOCK_TYPE: &str = "test::mock";
/// Component type of [`MockNetResource`] in [`test_registry`].
pub const MOCK_NET_TYPE: &str = "test::net";
/// Component type of [`MockComposite`] in [`test_registry`].
pub const MOCK_COMPOSITE_TYPE: &str = "test::composite";

/// Configuration key that makes a double fail its `init`.
pub const FAIL_INIT_KEY: &str = "failInit";

/// Lifecycle call counters shared by every double of one registry.
#[derive(Debug, Default)]
pub struct MockCounters {
    created: AtomicUsize,
    inits: AtomicUsize,
    destroys: AtomicUsize,
}

impl MockCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Successful `init` calls.
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Instances initialized and not yet destroyed.
    pub fn live(&self) -> usize {
        self.inits().saturating_sub(self.destroys())
    }
}

fn check_fail_init(configuration: &Configuration) -> Result<()> {
    if configuration
        .get(FAIL_INIT_KEY)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return Err(NodusError::ConfigValue {
            field: FAIL_INIT_KEY.to_string(),
            cause: "init failure requested".to_string(),
        });
    }
    Ok(())
}

/// Plain component: records its configuration and echoes messages.
pub struct MockComponent {
    component_type: String,
    counters: Arc<MockCounters>,
    configuration: Configuration,
}

impl MockComponent {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self::with_counters(component_type, Arc::new(MockCounters::default()))
    }

    pub fn with_counters(component_type: impl Into<String>, counters: Arc<MockCounters>) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self {
            component_type: component_type.into(),
            counters,
            configuration: Configuration::new(),
        }
    }

    /// The configuration received by `init`.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl Component for MockComponent {
    fn component_type(&self) -> &str {
        &self.component_type
    }

    fn init(&mut self, _config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        check_fail_init(configuration)?;
        self.configuration = configuration.clone();
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        Box::pin(async move { Ok(Outcome::success(msg)) })
    }

    fn destroy(&self) {
        self.counters.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connection-bearing double. Its connection is the `server` string.
pub struct MockNetResource {
    inner: MockComponent,
    server: Arc<Mutex<Option<String>>>,
}

impl MockNetResource {
    pub fn new(counters: Arc<MockCounters>) -> Self {
        Self {
            inner: MockComponent::with_counters(MOCK_NET_TYPE, counters),
            server: Arc::new(Mutex::new(None)),
        }
    }
}

impl Component for MockNetResource {
    fn component_type(&self) -> &str {
        self.inner.component_type()
    }

    fn init(&mut self, config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        let server = configuration
            .get("server")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.inner.init(config, configuration)?;
        *self.server.lock() = Some(server);
        Ok(())
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        self.inner.process(msg)
    }

    fn destroy(&self) {
        self.server.lock().take();
        self.inner.destroy();
    }

    fn as_net_resource(&self) -> Option<&dyn NetResource> {
        Some(self)
    }
}

impl NetResource for MockNetResource {
    fn net_resource(&self) -> Result<SharedResource> {
        let server = self
            .server
            .lock()
            .clone()
            .ok_or_else(|| NodusError::ClientNotInitialized {
                component_type: MOCK_NET_TYPE.to_string(),
            })?;
        Ok(Arc::new(server))
    }
}

/// Composite double that records every child reload it receives.
pub struct MockComposite {
    inner: MockComponent,
    reloads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockComposite {
    pub fn new(counters: Arc<MockCounters>) -> Self {
        Self {
            inner: MockComponent::with_counters(MOCK_COMPOSITE_TYPE, counters),
            reloads: Mutex::new(Vec::new()),
        }
    }

    /// Child ids reloaded so far, in call order.
    pub fn reloaded_children(&self) -> Vec<String> {
        self.reloads.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

impl Component for MockComposite {
    fn component_type(&self) -> &str {
        self.inner.component_type()
    }

    fn init(&mut self, config: &EngineConfig, configuration: &Configuration) -> Result<()> {
        self.inner.init(config, configuration)
    }

    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
        self.inner.process(msg)
    }

    fn destroy(&self) {
        self.inner.destroy();
    }

    fn as_composite(&self) -> Option<&dyn Composite> {
        Some(self)
    }
}

impl Composite for MockComposite {
    fn reload_child(&self, child_id: &str, dsl: &[u8]) -> Result<()> {
        self.reloads.lock().push((child_id.to_string(), dsl.to_vec()));
        Ok(())
    }
}

/// A registry holding the three doubles, plus their shared counters.
pub fn test_registry() -> (Arc<ComponentRegistry>, Arc<MockCounters>) {
    let registry = ComponentRegistry::new();
    let counters = Arc::new(MockCounters::default());

    let c = Arc::clone(&counters);
    registry.register_fn(MOCK_TYPE, move || {
        Box::new(MockComponent::with_counters(MOCK_TYPE, Arc::clone(&c)))
    });
    let c = Arc::clone(&counters);
    registry.register_fn(MOCK_NET_TYPE, move || {
        Box::new(MockNetResource::new(Arc::clone(&c)))
    });
    let c = Arc::clone(&counters);
    registry.register_fn(MOCK_COMPOSITE_TYPE, move || {
        Box::new(MockComposite::new(Arc::clone(&c)))
    });

    (Arc::new(registry), counters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counters_track_lifecycle() {
        let (registry, counters) = test_registry();
        let mut component = registry.new_component(MOCK_NET_TYPE, "n1").unwrap();
        assert_eq!(counters.created(), 1);

        let mut configuration = Configuration::new();
        configuration.insert("server".to_string(), json!("127.0.0.1:1"));
        component.init(&EngineConfig::new(), &configuration).unwrap();
        assert_eq!(counters.live(), 1);

        let resource = component.as_net_resource().unwrap().net_resource().unwrap();
        assert_eq!(resource.downcast_ref::<String>().unwrap(), "127.0.0.1:1");

        component.destroy();
        assert_eq!(counters.live(), 0);
        assert!(component.as_net_resource().unwrap().net_resource().is_err());
    }

    #[tokio::test]
    async fn doubles_echo_messages() {
        let (registry, _) = test_registry();
        let composite = registry.new_component(MOCK_COMPOSITE_TYPE, "g1").unwrap();
        let msg = Message::new("TEST", crate::message::DataType::Text, "ping");
        let outcome = composite.process(msg.clone()).await.unwrap();
        assert_eq!(outcome.message, msg);

        composite
            .as_composite()
            .unwrap()
            .reload_child("c1", b"{}")
            .unwrap();
        assert!(composite.as_net_resource().is_none());
    }

    #[test]
    fn fail_init_flag() {
        let mut component = MockComponent::new(MOCK_TYPE);
        let mut configuration = Configuration::new();
        configuration.insert(FAIL_INIT_KEY.to_string(), json!(true));
        let err = component
            .init(&EngineConfig::new(), &configuration)
            .unwrap_err();
        assert!(err.is_config_error());
    }
}
