//! General purpose nodes.

mod log;

pub use log::{LOG_TYPE, LogLevel, LogNode};
