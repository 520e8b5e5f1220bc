//! nodus core library
//!
//! Foundational types for the nodus pipeline runtime: the component
//! capability traits, definitions and their decoders, the component
//! registry, process-wide properties and the lazy connection wrapper used
//! by connection-bearing components.
//!
//! # Key Components
//!
//! - **Traits**: [`Component`] with the optional [`NetResource`] and
//!   [`Composite`] capabilities, and the [`NetPool`] lookup seam
//! - **Definitions**: [`NodeDefinition`] and [`PipelineDefinition`], decoded
//!   by a [`parser::DefinitionParser`]
//! - **Registry**: [`ComponentRegistry`] mapping a type name to a factory
//! - **Connections**: [`NetResourceNode`] resolving a connection locally or
//!   through the pool

#![warn(clippy::all)]

pub mod config;
pub mod definition;
pub mod error;
pub mod message;
pub mod net_resource;
pub mod parser;
pub mod prelude;
pub mod properties;
pub mod registry;
pub mod testing;
pub mod traits;
pub mod value;

pub use config::{EngineConfig, EngineSettings};
pub use definition::{Configuration, NodeDefinition, PipelineDefinition};
pub use error::{NodusError, Result};
pub use message::{DataType, Message, Outcome, Relation};
pub use net_resource::{INIT_NET_RESOURCE_KEY, NetResourceNode, NodeUtils, REF_PREFIX};
pub use properties::Properties;
pub use registry::ComponentRegistry;
pub use traits::{Component, Composite, NetPool, NetResource, PipelineScope, SharedResource};
pub use value::Value;
