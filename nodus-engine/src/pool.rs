//! Shared pool of connection-bearing node contexts.
//!
//! Two levels: component type to [`NodePool`], resource id to
//! [`PooledContext`]. Each id owns a slot whose construction lock makes
//! building and tearing down the same key mutually exclusive, while
//! lookups read the published entry without locking.
//!
//! ```text
//!   ResourcePool
//!     "net::tcp_client" -> NodePool { "tcp01" -> Slot -> PooledContext,
//!                                     "tcp02" -> Slot -> PooledContext }
//!     "net::mqtt"       -> NodePool { ... }
//! ```

use crate::node_ctx::{Binding, NodeContext};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use nodus_core::config::EngineConfig;
use nodus_core::definition::NodeDefinition;
use nodus_core::error::{NodusError, Result};
use nodus_core::message::{Message, Outcome};
use nodus_core::net_resource::NodeUtils;
use nodus_core::traits::{NetPool, SharedResource};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A node context owned by the pool.
///
/// Its component always exposes a shared connection, and its id stays the
/// pool key across reloads.
pub struct PooledContext {
    node_type: String,
    resource_id: String,
    ctx: NodeContext,
}

impl PooledContext {
    fn build(config: &EngineConfig, definition: NodeDefinition) -> Result<Self> {
        let node_type = definition.node_type.clone();
        let resource_id = definition.id.clone();
        let ctx = NodeContext::with_binding(config.clone(), None, definition, Binding::NetResource)?;
        Ok(Self {
            node_type,
            resource_id,
            ctx,
        })
    }

    /// The pool key's resource id.
    pub fn id(&self) -> &str {
        &self.resource_id
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn definition(&self) -> NodeDefinition {
        self.ctx.definition()
    }

    /// The underlying node context.
    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// Whether the instance was built by the pool. Always true for live entries.
    pub fn is_init_net_resource(&self) -> bool {
        NodeUtils::is_init_net_resource(&self.ctx.definition().configuration)
    }

    /// The shared connection of the current instance.
    pub fn net_resource(&self) -> Result<SharedResource> {
        self.ctx.net_resource()
    }

    pub async fn process(&self, msg: Message) -> Result<Outcome> {
        self.ctx.process(msg).await
    }

    /// Reconfigure the entry in place.
    ///
    /// The decoded id is replaced by the pool key. The component type must
    /// stay the same and remain connection-bearing; otherwise the current
    /// instance is kept and an error is returned.
    pub fn reload_self(&self, dsl: &[u8]) -> Result<()> {
        let mut definition = self.ctx.config().parser.decode_node(dsl)?;
        if definition.node_type.is_empty() {
            definition.node_type = self.node_type.clone();
        } else if definition.node_type != self.node_type {
            return Err(NodusError::ConfigValue {
                field: "type".to_string(),
                cause: format!(
                    "pooled resource {} cannot change type to {}",
                    self.node_type, definition.node_type
                ),
            });
        }
        definition.id = self.resource_id.clone();
        self.ctx.reload_definition(definition)
    }

    pub fn destroy(&self) {
        self.ctx.destroy();
    }
}

impl std::fmt::Debug for PooledContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledContext")
            .field("node_type", &self.node_type)
            .field("resource_id", &self.resource_id)
            .finish()
    }
}

#[derive(Default)]
struct Slot {
    build: Mutex<()>,
    ready: ArcSwapOption<PooledContext>,
    retired: AtomicBool,
}

/// Entries of one component type.
pub struct NodePool {
    node_type: String,
    config: EngineConfig,
    entries: DashMap<String, Arc<Slot>>,
    /// Set once by `stop`; no entry is published afterwards.
    stopped: AtomicBool,
}

impl NodePool {
    pub fn new(config: EngineConfig, node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            config,
            entries: DashMap::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Return the entry for `id`, building it from `dsl` if absent.
    ///
    /// An existing entry is returned unchanged and `dsl` is not decoded. A
    /// non-empty `id` overrides the decoded id.
    pub fn create(&self, id: &str, dsl: &[u8]) -> Result<Arc<PooledContext>> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let mut definition = self.config.parser.decode_node(dsl)?;
        if !id.is_empty() {
            definition.id = id.to_string();
        }
        self.create_from_def(definition)
    }

    /// Return the entry for `definition.id`, building it if absent.
    ///
    /// Concurrent calls for the same id build one instance and all receive it.
    /// Fails with `PoolStopped` once [`NodePool::stop`] has run.
    pub fn create_from_def(&self, mut definition: NodeDefinition) -> Result<Arc<PooledContext>> {
        if definition.node_type.is_empty() {
            definition.node_type = self.node_type.clone();
        } else if definition.node_type != self.node_type {
            return Err(NodusError::ConfigValue {
                field: "type".to_string(),
                cause: format!(
                    "definition type {} does not match pool type {}",
                    definition.node_type, self.node_type
                ),
            });
        }
        let id = definition.id.clone();

        loop {
            let slot = Arc::clone(
                self.entries
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(Slot::default()))
                    .value(),
            );
            if let Some(ready) = slot.ready.load_full() {
                return Ok(ready);
            }

            let _build = slot.build.lock();
            if slot.retired.load(Ordering::Acquire) {
                // Deleted while we waited; start over with a fresh slot.
                continue;
            }
            if let Some(ready) = slot.ready.load_full() {
                return Ok(ready);
            }
            if self.stopped.load(Ordering::SeqCst) {
                slot.retired.store(true, Ordering::Release);
                self.entries.remove_if(&id, |_, s| Arc::ptr_eq(s, &slot));
                return Err(NodusError::PoolStopped {
                    component_type: self.node_type.clone(),
                });
            }

            return match PooledContext::build(&self.config, definition) {
                Ok(ctx) => {
                    let ctx = Arc::new(ctx);
                    slot.ready.store(Some(Arc::clone(&ctx)));
                    tracing::info!(
                        node_type = %self.node_type,
                        resource_id = %id,
                        "Net resource created"
                    );
                    Ok(ctx)
                }
                Err(err) => {
                    slot.retired.store(true, Ordering::Release);
                    self.entries.remove_if(&id, |_, s| Arc::ptr_eq(s, &slot));
                    tracing::warn!(
                        node_type = %self.node_type,
                        resource_id = %id,
                        error = %err,
                        "Net resource creation failed"
                    );
                    Err(err)
                }
            };
        }
    }

    /// Lookup only; never builds.
    pub fn get(&self, id: &str) -> Option<Arc<PooledContext>> {
        self.entries.get(id).and_then(|slot| slot.ready.load_full())
    }

    /// The connection of the entry `id`.
    pub fn net_resource(&self, id: &str) -> Result<SharedResource> {
        match self.get(id) {
            Some(ctx) => ctx.net_resource(),
            None => Err(NodusError::NetResourceNotFound {
                component_type: self.node_type.clone(),
                id: id.to_string(),
            }),
        }
    }

    /// Remove and destroy the entry `id`. No-op when absent.
    pub fn del(&self, id: &str) {
        let Some(slot) = self.entries.get(id).map(|s| Arc::clone(s.value())) else {
            return;
        };
        let _build = slot.build.lock();
        slot.retired.store(true, Ordering::Release);
        let removed = slot.ready.swap(None);
        self.entries.remove_if(id, |_, s| Arc::ptr_eq(s, &slot));

        if let Some(ctx) = removed {
            tracing::info!(node_type = %self.node_type, resource_id = %id, "Net resource deleted");
            ctx.destroy();
        }
    }

    /// Remove and destroy every entry. The sub-pool accepts no new entries
    /// afterwards.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.del(&id);
        }
    }

    /// Snapshot of the fully built entries, ordered by id.
    pub fn get_all(&self) -> Vec<Arc<PooledContext>> {
        let mut items: Vec<Arc<PooledContext>> = self
            .entries
            .iter()
            .filter_map(|slot| slot.ready.load_full())
            .collect();
        items.sort_by(|a, b| a.id().cmp(b.id()));
        items
    }

    /// Visit fully built entries until `f` returns false.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Arc<PooledContext>) -> bool,
    {
        for ctx in self.get_all() {
            if !f(ctx.id(), &ctx) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| slot.ready.load().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Process-wide pool of shared network resources.
///
/// Components reach it through [`EngineConfig::net_pool`]; install it with
/// `config.with_net_pool(pool)` on the configuration given to consumers.
pub struct ResourcePool {
    config: EngineConfig,
    pools: DashMap<String, Arc<NodePool>>,
}

impl ResourcePool {
    /// Create an empty pool. `config` is used to build every entry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            pools: DashMap::new(),
        }
    }

    /// The sub-pool of `node_type`, created on first use.
    pub fn node_pool(&self, node_type: &str) -> Arc<NodePool> {
        if let Some(pool) = self.pools.get(node_type) {
            return Arc::clone(pool.value());
        }
        Arc::clone(
            self.pools
                .entry(node_type.to_string())
                .or_insert_with(|| Arc::new(NodePool::new(self.config.clone(), node_type)))
                .value(),
        )
    }

    /// See [`NodePool::create`].
    ///
    /// A sub-pool stopped mid-call is replaced by a fresh one and the call
    /// is retried there.
    pub fn create(&self, node_type: &str, id: &str, dsl: &[u8]) -> Result<Arc<PooledContext>> {
        loop {
            match self.node_pool(node_type).create(id, dsl) {
                Err(NodusError::PoolStopped { .. }) => continue,
                result => return result,
            }
        }
    }

    /// See [`NodePool::create_from_def`]. The sub-pool is chosen by `definition.node_type`.
    pub fn create_from_def(&self, definition: NodeDefinition) -> Result<Arc<PooledContext>> {
        loop {
            match self
                .node_pool(&definition.node_type)
                .create_from_def(definition.clone())
            {
                Err(NodusError::PoolStopped { .. }) => continue,
                result => return result,
            }
        }
    }

    pub fn get(&self, node_type: &str, id: &str) -> Option<Arc<PooledContext>> {
        self.existing(node_type).and_then(|pool| pool.get(id))
    }

    /// The connection of `(node_type, id)`.
    pub fn net_resource(&self, node_type: &str, id: &str) -> Result<SharedResource> {
        match self.existing(node_type) {
            Some(pool) => pool.net_resource(id),
            None => Err(NodusError::NetResourceNotFound {
                component_type: node_type.to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Remove and destroy one entry. No-op when absent.
    pub fn del(&self, node_type: &str, id: &str) {
        if let Some(pool) = self.existing(node_type) {
            pool.del(id);
        }
    }

    /// Tear down every entry of every type.
    pub fn stop(&self) {
        let types: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        for node_type in types {
            self.stop_type(&node_type);
        }
        tracing::info!("Resource pool stopped");
    }

    /// Tear down every entry of one type and drop its sub-pool.
    ///
    /// The sub-pool leaves the map before it is drained, so a retrying
    /// `create` lands in a fresh one.
    pub fn stop_type(&self, node_type: &str) {
        if let Some((_, pool)) = self.pools.remove(node_type) {
            pool.stop();
        }
    }

    /// Snapshot of every sub-pool, including empty ones.
    pub fn get_all(&self) -> HashMap<String, Vec<Arc<PooledContext>>> {
        let pools: Vec<Arc<NodePool>> = self.pools.iter().map(|e| Arc::clone(e.value())).collect();
        pools
            .into_iter()
            .map(|pool| (pool.node_type().to_string(), pool.get_all()))
            .collect()
    }

    fn existing(&self, node_type: &str) -> Option<Arc<NodePool>> {
        self.pools.get(node_type).map(|p| Arc::clone(p.value()))
    }
}

impl NetPool for ResourcePool {
    fn net_resource(&self, node_type: &str, id: &str) -> Result<SharedResource> {
        ResourcePool::net_resource(self, node_type, id)
    }

    fn contains(&self, node_type: &str, id: &str) -> bool {
        self.get(node_type, id).is_some()
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        types.sort();
        f.debug_struct("ResourcePool").field("types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodus_core::INIT_NET_RESOURCE_KEY;
    use nodus_core::testing::{MOCK_NET_TYPE, MOCK_TYPE, MockCounters, test_registry};
    use std::sync::Barrier;

    fn pool() -> (ResourcePool, Arc<MockCounters>) {
        let (registry, counters) = test_registry();
        (
            ResourcePool::new(EngineConfig::new().with_registry(registry)),
            counters,
        )
    }

    fn dsl(server: &str) -> Vec<u8> {
        format!(r#"{{"type":"test::net","configuration":{{"server":"{server}"}}}}"#).into_bytes()
    }

    fn server_of(pool: &ResourcePool, id: &str) -> String {
        let conn = pool.net_resource(MOCK_NET_TYPE, id).unwrap();
        conn.downcast_ref::<String>().unwrap().clone()
    }

    #[test]
    fn create_is_idempotent() {
        let (pool, counters) = pool();
        let first = pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).unwrap();
        let second = pool.create(MOCK_NET_TYPE, "tcp01", &dsl("b:2")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(server_of(&pool, "tcp01"), "a:1");
        assert_eq!(counters.created(), 1);

        // An existing entry short-circuits before decoding.
        let third = pool.create(MOCK_NET_TYPE, "tcp01", b"{").unwrap();
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn entry_is_marked_as_pool_owned() {
        let (pool, _) = pool();
        let ctx = pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).unwrap();
        assert!(ctx.is_init_net_resource());
        assert_eq!(ctx.id(), "tcp01");
        assert!(ctx.definition().configuration.contains_key(INIT_NET_RESOURCE_KEY));
    }

    #[test]
    fn non_net_component_is_rejected_before_init() {
        let (pool, counters) = pool();
        let err = pool
            .create(MOCK_TYPE, "log01", br#"{"type":"test::mock"}"#)
            .unwrap_err();
        assert!(matches!(err, NodusError::NotNetResource { .. }));
        assert_eq!(counters.inits(), 0);
        assert!(pool.get(MOCK_TYPE, "log01").is_none());
        assert!(pool.node_pool(MOCK_TYPE).is_empty());
    }

    #[test]
    fn failed_init_leaves_no_entry() {
        let (pool, _) = pool();
        let err = pool
            .create(
                MOCK_NET_TYPE,
                "tcp01",
                br#"{"type":"test::net","configuration":{"failInit":true}}"#,
            )
            .unwrap_err();
        assert!(matches!(err, NodusError::ComponentInit { .. }));
        assert!(pool.get(MOCK_NET_TYPE, "tcp01").is_none());

        assert!(pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).is_ok());
    }

    #[test]
    fn decode_error_and_type_mismatch() {
        let (pool, _) = pool();
        assert!(matches!(
            pool.create(MOCK_NET_TYPE, "x", b"{").unwrap_err(),
            NodusError::DefinitionDecode { .. }
        ));
        assert!(matches!(
            pool.create("other::type", "x", &dsl("a:1")).unwrap_err(),
            NodusError::ConfigValue { .. }
        ));
    }

    #[test]
    fn lookups_and_delete() {
        let (pool, counters) = pool();
        assert!(pool.get(MOCK_NET_TYPE, "tcp01").is_none());
        assert!(matches!(
            pool.net_resource(MOCK_NET_TYPE, "tcp01"),
            Err(NodusError::NetResourceNotFound { .. })
        ));

        pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).unwrap();
        assert!(NetPool::contains(&pool, MOCK_NET_TYPE, "tcp01"));

        pool.del(MOCK_NET_TYPE, "tcp01");
        pool.del(MOCK_NET_TYPE, "tcp01");
        pool.del("unknown", "tcp01");
        assert!(pool.get(MOCK_NET_TYPE, "tcp01").is_none());
        assert_eq!(counters.destroys(), 1);
    }

    #[test]
    fn reload_is_visible_through_the_key() {
        let (pool, counters) = pool();
        let ctx = pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).unwrap();
        ctx.reload_self(br#"{"id":"ignored","type":"test::net","configuration":{"server":"b:2"}}"#)
            .unwrap();

        assert_eq!(server_of(&pool, "tcp01"), "b:2");
        assert_eq!(ctx.id(), "tcp01");
        assert_eq!(ctx.definition().id, "tcp01");
        assert!(ctx.is_init_net_resource());
        assert_eq!(counters.live(), 1);
    }

    #[test]
    fn pooled_reload_rejects_type_change() {
        let (pool, _) = pool();
        let ctx = pool.create(MOCK_NET_TYPE, "tcp01", &dsl("a:1")).unwrap();
        let err = ctx.reload_self(br#"{"type":"test::mock"}"#).unwrap_err();
        assert!(matches!(err, NodusError::ConfigValue { .. }));
        assert_eq!(server_of(&pool, "tcp01"), "a:1");
    }

    #[test]
    fn stop_and_get_all() {
        let (pool, counters) = pool();
        pool.create(MOCK_NET_TYPE, "b", &dsl("b:1")).unwrap();
        pool.create(MOCK_NET_TYPE, "a", &dsl("a:1")).unwrap();
        let _ = pool.create(MOCK_TYPE, "x", br#"{"type":"test::mock"}"#);

        let all = pool.get_all();
        let ids: Vec<&str> = all[MOCK_NET_TYPE].iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(all[MOCK_TYPE].is_empty());

        let mut visited = 0;
        pool.node_pool(MOCK_NET_TYPE).range(|_, _| {
            visited += 1;
            false
        });
        assert_eq!(visited, 1);

        pool.stop();
        assert!(pool.get_all().is_empty());
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn stop_type_keeps_other_types() {
        let (pool, _) = pool();
        pool.create(MOCK_NET_TYPE, "a", &dsl("a:1")).unwrap();
        let _ = pool.node_pool("other::type");
        pool.stop_type(MOCK_NET_TYPE);
        let all = pool.get_all();
        assert!(!all.contains_key(MOCK_NET_TYPE));
        assert!(all.contains_key("other::type"));
    }

    #[test]
    fn concurrent_create_builds_once() {
        let (pool, counters) = pool();
        let n = 16;
        let barrier = Barrier::new(n);
        let results: Vec<Arc<PooledContext>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..n)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        pool.create(MOCK_NET_TYPE, "shared", &dsl("a:1")).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.len(), n);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(counters.created(), 1);
        assert_eq!(pool.get_all().len(), 1);
    }

    #[test]
    fn concurrent_create_and_delete_never_leak() {
        let (pool, counters) = pool();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let _ = pool.create(MOCK_NET_TYPE, "churn", &dsl("a:1"));
                    }
                });
                s.spawn(|| {
                    for _ in 0..100 {
                        pool.del(MOCK_NET_TYPE, "churn");
                    }
                });
            }
        });
        pool.stop();
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn concurrent_create_and_stop_never_leak() {
        let (pool, counters) = pool();
        for round in 0..50 {
            let created: Vec<Arc<PooledContext>> = std::thread::scope(|s| {
                let creator = s.spawn(|| {
                    (0..20)
                        .map(|i| {
                            pool.create(MOCK_NET_TYPE, &format!("k{round}-{i}"), &dsl("a:1"))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                });
                s.spawn(|| {
                    for _ in 0..20 {
                        pool.stop();
                    }
                });
                creator.join().unwrap()
            });

            // Every entry handed out is either reachable or already torn down.
            for ctx in &created {
                let reachable = pool
                    .get(MOCK_NET_TYPE, ctx.id())
                    .is_some_and(|found| Arc::ptr_eq(&found, ctx));
                assert!(reachable || ctx.context().is_destroyed());
            }
        }
        pool.stop();
        assert!(pool.get_all().is_empty());
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn stopped_node_pool_refuses_new_entries() {
        let (pool, counters) = pool();
        let sub = pool.node_pool(MOCK_NET_TYPE);
        sub.create("a", &dsl("a:1")).unwrap();
        pool.stop_type(MOCK_NET_TYPE);

        assert!(sub.is_stopped());
        assert!(matches!(
            sub.create("b", &dsl("b:1")),
            Err(NodusError::PoolStopped { .. })
        ));
        assert!(sub.is_empty());
        assert_eq!(counters.live(), 0);

        // The pool itself moves on to a fresh sub-pool.
        pool.create(MOCK_NET_TYPE, "b", &dsl("b:1")).unwrap();
        assert!(!pool.node_pool(MOCK_NET_TYPE).is_stopped());
        assert_eq!(counters.live(), 1);
    }

    #[test]
    fn deleted_entry_cannot_be_revived() {
        let (pool, counters) = pool();
        let ctx = pool.create(MOCK_NET_TYPE, "r1", &dsl("a:1")).unwrap();
        pool.del(MOCK_NET_TYPE, "r1");

        let err = ctx.reload_self(&dsl("b:2")).unwrap_err();
        assert!(matches!(err, NodusError::UnsupportedOperation { .. }));
        assert!(pool.get(MOCK_NET_TYPE, "r1").is_none());
        assert_eq!(counters.live(), 0);
    }
}
