//! Lookup seam between connection-bearing components and the resource pool.

use super::component::SharedResource;
use crate::error::Result;

/// Resolves pooled network resources by `(component type, resource id)`.
pub trait NetPool: Send + Sync {
    /// Fetch the current connection of a pooled resource.
    fn net_resource(&self, node_type: &str, id: &str) -> Result<SharedResource>;

    /// Whether a pooled resource exists under the key.
    fn contains(&self, node_type: &str, id: &str) -> bool;
}
