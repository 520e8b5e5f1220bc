//! Structured logging setup.
//!
//! The format is chosen with `NODUS_LOG_FORMAT`:
//! - `json`: one JSON object per event (ELK, Loki)
//! - `pretty`: multi-line output for development
//! - `compact`: single-line output (default)
//!
//! The filter comes from `NODUS_LOG_LEVEL`, then `RUST_LOG`, then `info`.
//!
//! # Example
//!
//! ```ignore
//! use nodus_engine::observability::{TracingConfig, init_tracing};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};

/// Span for lifecycle work on one node.
#[macro_export]
macro_rules! node_span {
    ($node_id:expr, $node_type:expr, $operation:expr) => {
        tracing::info_span!(
            "node_lifecycle",
            node_id = %$node_id,
            node_type = %$node_type,
            operation = $operation
        )
    };
}
