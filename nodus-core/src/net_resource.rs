//! Lazy connection handling for connection-bearing components.
//!
//! A component whose connection parameter is `ref://<id>` runs in pooled
//! mode: it never dials, it resolves the shared connection from the
//! engine's [`NetPool`] on every use. Any other value selects local mode,
//! where the component dials once during `init` and owns the result.

use crate::config::EngineConfig;
use crate::definition::{Configuration, VARS_KEY};
use crate::error::{NodusError, Result};
use crate::traits::NetPool;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefix marking a configuration value as a pool reference.
pub const REF_PREFIX: &str = "ref://";

/// Configuration key injected by the pool into the definitions it builds.
pub const INIT_NET_RESOURCE_KEY: &str = "$initNetResource";

/// Helpers shared by component implementations.
pub struct NodeUtils;

impl NodeUtils {
    /// Whether `value` designates a pooled resource.
    pub fn is_net_pool_ref(value: &str) -> bool {
        value.starts_with(REF_PREFIX)
    }

    /// The resource id of a pool reference, `None` for literal values.
    pub fn net_resource_id(value: &str) -> Option<&str> {
        value.strip_prefix(REF_PREFIX)
    }

    /// Whether the configuration belongs to an instance the pool itself owns.
    pub fn is_init_net_resource(configuration: &Configuration) -> bool {
        configuration.contains_key(INIT_NET_RESOURCE_KEY)
    }

    /// The `vars` entry of a configuration, empty when absent or not a map.
    pub fn vars(configuration: &Configuration) -> Configuration {
        configuration
            .get(VARS_KEY)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }
}

/// Single-flight connect guard.
///
/// Advisory only: a caller that loses [`ConnectGuard::try_claim`] must not
/// assume the winner has finished.
#[derive(Debug, Default)]
pub struct ConnectGuard {
    connecting: AtomicBool,
}

impl ConnectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move from idle to connecting. Returns true for the caller that won.
    pub fn try_claim(&self) -> bool {
        self.connecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Back to idle.
    pub fn release(&self) {
        self.connecting.store(false, Ordering::Release);
    }
}

type DialFn<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

enum Mode<T> {
    Unbound,
    Pooled {
        resource_id: String,
        pool: Option<Arc<dyn NetPool>>,
    },
    Local {
        dial: DialFn<T>,
        connection: RwLock<Option<T>>,
    },
}

/// Resolves a component's connection either through the pool or locally.
///
/// `T` is the connection handle type; it is cloned out on every
/// [`NetResourceNode::connection`] call, so it is normally an `Arc`.
pub struct NetResourceNode<T> {
    node_type: String,
    mode: Mode<T>,
    guard: ConnectGuard,
}

impl<T> NetResourceNode<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            mode: Mode::Unbound,
            guard: ConnectGuard::new(),
        }
    }

    /// Bind the wrapper to `server`.
    ///
    /// A `ref://<id>` value records the pool key and performs no I/O. Any
    /// other value invokes `dial` immediately; its error is returned as is.
    pub fn init<F>(&mut self, config: &EngineConfig, server: &str, dial: F) -> Result<()>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        if let Some(resource_id) = NodeUtils::net_resource_id(server) {
            tracing::debug!(
                node_type = %self.node_type,
                resource_id = %resource_id,
                "Binding to pooled net resource"
            );
            self.mode = Mode::Pooled {
                resource_id: resource_id.to_string(),
                pool: config.net_pool.clone(),
            };
            return Ok(());
        }

        let connection = dial()?;
        self.mode = Mode::Local {
            dial: Box::new(dial),
            connection: RwLock::new(Some(connection)),
        };
        Ok(())
    }

    /// The current connection.
    ///
    /// Pooled mode looks the resource up on every call so a reload of the
    /// pooled entry is seen by the next call.
    pub fn connection(&self) -> Result<T> {
        match &self.mode {
            Mode::Pooled { resource_id, pool } => {
                let pool = pool.as_ref().ok_or_else(|| NodusError::NetPoolUnavailable {
                    id: resource_id.clone(),
                })?;
                let resource = pool.net_resource(&self.node_type, resource_id)?;
                resource.downcast_ref::<T>().cloned().ok_or_else(|| {
                    NodusError::ConnectionTypeMismatch {
                        component_type: self.node_type.clone(),
                        id: resource_id.clone(),
                        expected: std::any::type_name::<T>(),
                    }
                })
            }
            Mode::Local { connection, .. } => {
                connection
                    .read()
                    .clone()
                    .ok_or_else(|| NodusError::ClientNotInitialized {
                        component_type: self.node_type.clone(),
                    })
            }
            Mode::Unbound => Err(NodusError::ClientNotInitialized {
                component_type: self.node_type.clone(),
            }),
        }
    }

    /// Replace the local connection with a fresh dial.
    ///
    /// Not available in pooled mode; the pool owns that connection.
    pub fn redial(&self) -> Result<T> {
        match &self.mode {
            Mode::Local { dial, connection } => {
                let fresh = dial()?;
                *connection.write() = Some(fresh.clone());
                Ok(fresh)
            }
            Mode::Pooled { .. } => Err(NodusError::UnsupportedOperation {
                operation: "redial",
                component_type: self.node_type.clone(),
            }),
            Mode::Unbound => Err(NodusError::ClientNotInitialized {
                component_type: self.node_type.clone(),
            }),
        }
    }

    /// Drop the local connection. Returns it so the caller can close it.
    pub fn take_local(&self) -> Option<T> {
        match &self.mode {
            Mode::Local { connection, .. } => connection.write().take(),
            _ => None,
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.mode, Mode::Pooled { .. })
    }

    /// The pool resource id in pooled mode.
    pub fn resource_id(&self) -> Option<&str> {
        match &self.mode {
            Mode::Pooled { resource_id, .. } => Some(resource_id),
            _ => None,
        }
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn try_claim_connect(&self) -> bool {
        self.guard.try_claim()
    }

    pub fn is_connecting(&self) -> bool {
        self.guard.is_connecting()
    }

    pub fn mark_connected(&self) {
        self.guard.release();
    }
}

impl<T> std::fmt::Debug for NetResourceNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            Mode::Unbound => "unbound",
            Mode::Pooled { .. } => "pooled",
            Mode::Local { .. } => "local",
        };
        f.debug_struct("NetResourceNode")
            .field("node_type", &self.node_type)
            .field("mode", &mode)
            .field("connecting", &self.guard.is_connecting())
            .finish()
    }
}
