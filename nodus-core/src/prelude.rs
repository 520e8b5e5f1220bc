//! Prelude for convenient imports.
//!
//! ```ignore
//! use nodus_core::prelude::*;
//! ```

// Error handling
pub use crate::error::{NodusError, Result};

// Data model
pub use crate::definition::{
    Configuration, NodeDefinition, PipelineDefinition, PipelineInfo, PipelineMetadata,
};
pub use crate::message::{DataType, Message, Metadata, Outcome, Relation};
pub use crate::value::Value;

// Configuration
pub use crate::config::{EngineConfig, EngineSettings};
pub use crate::parser::{DefinitionParser, JsonParser, YamlParser};
pub use crate::properties::Properties;
pub use crate::registry::ComponentRegistry;

// Traits
pub use crate::traits::{
    Component, ComponentFactory, Composite, FnFactory, NetPool, NetResource, PipelineScope,
    ProcessFuture, SharedResource,
};

// Connections
pub use crate::net_resource::{ConnectGuard, NetResourceNode, NodeUtils};
