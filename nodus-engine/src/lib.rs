//! nodus engine
//!
//! Binds node definitions to live component instances and keeps them
//! replaceable while the pipeline runs.
//!
//! - [`vars`]: bind-time `${scope.name}` resolution
//! - [`node_ctx`]: [`NodeContext`], the stable handle with atomic reload
//! - [`pool`]: [`ResourcePool`], shared connection-bearing contexts keyed by
//!   component type and resource id
//! - [`pipeline`]: pipeline scope and its node contexts
//! - [`observability`]: tracing subscriber setup
//!
//! # Example
//!
//! ```ignore
//! use nodus_core::EngineConfig;
//! use nodus_engine::ResourcePool;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::new().with_registry(registry);
//! let pool = Arc::new(ResourcePool::new(config.clone()));
//! pool.create("net::tcp_client", "tcp01", br#"{"type":"net::tcp_client","configuration":{"server":"127.0.0.1:9000"}}"#)?;
//!
//! // Consumers configured with `"server": "ref://tcp01"` resolve through the pool.
//! let consumer_config = config.with_net_pool(pool.clone());
//! ```

#![warn(clippy::all)]

pub mod node_ctx;
pub mod observability;
pub mod pipeline;
pub mod pool;
pub mod vars;

pub use node_ctx::{NodeContext, NodeState};
pub use pipeline::{PipelineContext, PipelineVars};
pub use pool::{NodePool, PooledContext, ResourcePool};
pub use vars::{PipelineScope, resolve};
