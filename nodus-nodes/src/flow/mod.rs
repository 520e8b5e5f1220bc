//! Flow control nodes:
//! - [`FilterNode`] reports `True`/`False` for a field comparison
//! - [`GroupNode`] runs child nodes in sequence and can reload them individually

mod filter;
mod group;

pub use filter::{FILTER_TYPE, FilterNode, FilterOp};
pub use group::{GROUP_TYPE, GroupNode};
