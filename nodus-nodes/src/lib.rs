//! Standard nodes for nodus.
//!
//! ## Common (`common::*`)
//! - [`common::LogNode`] (`std::log`) - Logs each message through `tracing`
//!
//! ## Flow Control (`flow::*`)
//! - [`flow::FilterNode`] (`std::filter`) - Field comparison, `True`/`False`
//! - [`flow::GroupNode`] (`std::group`) - Sequential composite with child reload
//!
//! ## Network (`net::*`)
//! - [`net::TcpClientNode`] (`net::tcp_client`) - Line-oriented TCP client,
//!   local or pooled

pub mod common;
mod config;
pub mod flow;
pub mod net;

use nodus_core::registry::ComponentRegistry;

pub use common::{LOG_TYPE, LogNode};
pub use flow::{FILTER_TYPE, FilterNode, FilterOp, GROUP_TYPE, GroupNode};
pub use net::{TCP_CLIENT_TYPE, TcpClient, TcpClientNode};

/// Register every standard node.
pub fn register_std(registry: &ComponentRegistry) {
    registry.register_fn(LOG_TYPE, || Box::new(LogNode::new()));
    registry.register_fn(FILTER_TYPE, || Box::new(FilterNode::new()));
    registry.register_fn(GROUP_TYPE, || Box::new(GroupNode::new()));
    registry.register_fn(TCP_CLIENT_TYPE, || Box::new(TcpClientNode::new()));
}
