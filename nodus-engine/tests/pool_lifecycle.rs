//! Resource pool lifecycle through the public API.

use nodus_core::testing::{MOCK_NET_TYPE, MOCK_TYPE, test_registry};
use nodus_core::{EngineConfig, NodusError};
use nodus_engine::ResourcePool;

const CLIENT_DSL: &[u8] = br#"{
    "id": "my_net_client",
    "type": "test::net",
    "name": "push data",
    "debugMode": false,
    "configuration": {
        "server": "127.0.0.1:1883",
        "topic": "/device/msg"
    }
}"#;

const NOT_NET_DSL: &[u8] = br#"{
    "id": "my_filter",
    "type": "test::mock",
    "configuration": {}
}"#;

#[test]
fn pool_create_get_delete_stop() {
    let (registry, counters) = test_registry();
    let config = EngineConfig::new().with_registry(registry);
    let pool = ResourcePool::new(config.clone());
    assert!(pool.get_all().is_empty());

    let first = pool.create(MOCK_NET_TYPE, "client01", CLIENT_DSL).unwrap();
    let second = pool.create(MOCK_NET_TYPE, "client02", CLIENT_DSL).unwrap();
    assert_eq!(first.id(), "client01");
    assert!(second.is_init_net_resource());
    assert!(pool.get(MOCK_NET_TYPE, "client01").is_some());
    assert!(pool.get(MOCK_NET_TYPE, "client02").is_some());
    assert_eq!(pool.get_all()[MOCK_NET_TYPE].len(), 2);

    pool.del(MOCK_NET_TYPE, "client02");
    assert_eq!(pool.get_all()[MOCK_NET_TYPE].len(), 1);

    pool.del("net", "client02");
    assert_eq!(pool.get_all()[MOCK_NET_TYPE].len(), 1);

    assert!(pool.net_resource(MOCK_NET_TYPE, "client01").is_ok());
    assert!(matches!(
        pool.net_resource(MOCK_NET_TYPE, "client02"),
        Err(NodusError::NetResourceNotFound { .. })
    ));

    // The id falls back to the one in the definition.
    let def = config.parser.decode_node(CLIENT_DSL).unwrap();
    let third = pool.create_from_def(def).unwrap();
    assert_eq!(third.id(), "my_net_client");
    assert_eq!(pool.get_all()[MOCK_NET_TYPE].len(), 2);

    let err = pool.create(MOCK_TYPE, "filter01", NOT_NET_DSL).unwrap_err();
    assert!(matches!(err, NodusError::NotNetResource { .. }));
    assert_eq!(err.code(), "E201");
    // The sub-pool of the rejected type exists but holds nothing.
    assert_eq!(pool.get_all().len(), 2);
    assert!(pool.get_all()[MOCK_TYPE].is_empty());

    pool.stop();
    assert!(pool.get_all().is_empty());
    assert_eq!(counters.live(), 0);
}

#[test]
fn reload_then_delete_releases_every_instance() {
    let (registry, counters) = test_registry();
    let pool = ResourcePool::new(EngineConfig::new().with_registry(registry));

    let ctx = pool.create(MOCK_NET_TYPE, "client01", CLIENT_DSL).unwrap();
    for port in 1884..1890 {
        let dsl = String::from_utf8_lossy(CLIENT_DSL).replace("1883", &port.to_string());
        ctx.reload_self(dsl.as_bytes()).unwrap();
    }
    assert_eq!(counters.live(), 1);

    let conn = pool.net_resource(MOCK_NET_TYPE, "client01").unwrap();
    assert_eq!(conn.downcast_ref::<String>().unwrap(), "127.0.0.1:1889");

    pool.del(MOCK_NET_TYPE, "client01");
    assert_eq!(counters.live(), 0);
    // A handle kept after deletion still answers, but its instance is gone.
    assert!(ctx.context().is_destroyed());
}
