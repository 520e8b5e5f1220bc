//! Component trait and its optional capabilities.

use crate::config::EngineConfig;
use crate::definition::Configuration;
use crate::error::Result;
use crate::message::{Message, Outcome};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future for message processing.
pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<Outcome>> + Send + 'a>>;

/// A type-erased shared network resource (client or server handle).
pub type SharedResource = Arc<dyn Any + Send + Sync>;

/// The core trait for all pluggable processing units.
///
/// A component is created fresh by its factory, configured once through
/// [`Component::init`] and then shared immutably while it processes
/// messages. Optional capabilities are discovered through the `as_*`
/// queries instead of downcasting.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Component for Echo {
///     fn component_type(&self) -> &str {
///         "test::echo"
///     }
///
///     fn init(&mut self, _config: &EngineConfig, _configuration: &Configuration) -> Result<()> {
///         Ok(())
///     }
///
///     fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a> {
///         Box::pin(async move { Ok(Outcome::success(msg)) })
///     }
/// }
/// ```
pub trait Component: Send + Sync {
    /// Registry key of this component.
    fn component_type(&self) -> &str;

    /// Configure the component.
    ///
    /// On error the component must release whatever it acquired before
    /// returning; callers do not call [`Component::destroy`] on a component
    /// whose `init` failed.
    fn init(&mut self, config: &EngineConfig, configuration: &Configuration) -> Result<()>;

    /// Process one message.
    fn process<'a>(&'a self, msg: Message) -> ProcessFuture<'a>;

    /// Release resources. Must tolerate repeated calls.
    fn destroy(&self) {}

    /// Connection-bearing capability.
    fn as_net_resource(&self) -> Option<&dyn NetResource> {
        None
    }

    /// Child management capability of aggregating components.
    fn as_composite(&self) -> Option<&dyn Composite> {
        None
    }
}

/// A component that owns a shareable network client or server connection.
pub trait NetResource: Send + Sync {
    /// The underlying connection, used for pool reuse.
    fn net_resource(&self) -> Result<SharedResource>;
}

/// A component managing nested child nodes.
pub trait Composite: Send + Sync {
    /// Reload one child from definition bytes.
    fn reload_child(&self, child_id: &str, dsl: &[u8]) -> Result<()>;
}

/// Creates fresh, uninitialized component instances.
pub trait ComponentFactory: Send + Sync {
    /// The component type this factory creates.
    fn component_type(&self) -> &str;

    /// Create a new instance.
    fn create(&self) -> Box<dyn Component>;
}

/// Factory backed by a closure.
pub struct FnFactory<F> {
    component_type: String,
    create: F,
}

impl<F> FnFactory<F>
where
    F: Fn() -> Box<dyn Component> + Send + Sync,
{
    pub fn new(component_type: impl Into<String>, create: F) -> Self {
        Self {
            component_type: component_type.into(),
            create,
        }
    }
}

impl<F> ComponentFactory for FnFactory<F>
where
    F: Fn() -> Box<dyn Component> + Send + Sync,
{
    fn component_type(&self) -> &str {
        &self.component_type
    }

    fn create(&self) -> Box<dyn Component> {
        (self.create)()
    }
}
