//! Core traits for nodus components.
//!
//! - `Component`: the basic processing unit, with optional capabilities
//!   `NetResource` (shareable connection) and `Composite` (nested children)
//! - `ComponentFactory`: produces fresh component instances for the registry
//! - `NetPool`: resolves pooled connections for components running in pooled mode
//! - `PipelineScope`: pipeline variables consulted at bind time

mod component;
mod pool;
mod scope;

pub use component::{
    Component, ComponentFactory, Composite, FnFactory, NetResource, ProcessFuture, SharedResource,
};
pub use pool::NetPool;
pub use scope::PipelineScope;
