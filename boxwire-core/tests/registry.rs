//! Identity resolution and proxy caching.

mod common;

use std::sync::Arc;
use std::thread;

use boxwire_core::{
    ClassMapBuilder, Config, Connection, Instrument, Layer, Pattern, ProtocolError, Proxy, ProxyClass,
    SchemaError, TestBackend,
};
use boxwire_core::schema::{field, StatusDecl, TypeDecl};
use boxwire_core::proxy::ProxyCore;
use boxwire_types::ObjectId;

use common::{connect, script_class, scripted};

#[test]
fn test_same_uuid_resolves_to_identical_instance() {
    let (_sim, conn) = connect();
    let engine = conn.engine().unwrap();
    let id = engine.id().unwrap();

    let a = conn.resolve(id).unwrap();
    let b = conn.resolve(id).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let again = conn.engine().unwrap();
    assert!(Arc::ptr_eq(&engine, &again));
}

#[test]
fn test_nested_objects_share_the_cache() {
    let (_sim, conn) = connect();
    let scene = conn.engine().unwrap().new_scene().unwrap();
    let layer = scene.add_instrument_layer("sampler").unwrap();

    let listed = scene.layers().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(Arc::ptr_eq(&listed[0], &layer));
}

#[test]
fn test_cached_resolution_skips_class_lookup() {
    let (backend, conn) = scripted();
    let id = ObjectId::from_u128(11);
    script_class(&backend, &conn, id, "pattern");
    let class_path = conn.identity_path(id, "/get_class_name");

    conn.resolve(id).unwrap();
    conn.resolve(id).unwrap();
    assert_eq!(backend.count(&class_path), 1);
    assert_eq!(conn.cached_objects(), 1);
}

#[test]
fn test_concurrent_resolution_converges() {
    let (sim, conn) = connect();
    let id = sim.engine_id();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let conn = conn.clone();
            thread::spawn(move || conn.resolve(id).unwrap())
        })
        .collect();
    let proxies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for p in &proxies[1..] {
        assert!(Arc::ptr_eq(&proxies[0], p));
    }
    assert_eq!(conn.cached_objects(), 1);
}

#[test]
fn test_unknown_uuid_raises() {
    let (_sim, conn) = connect();
    let err = conn.resolve(ObjectId::from_u128(0xdead)).unwrap_err();
    let remote = err.remote().expect("engine error");
    assert!(remote.message.contains("not found"));
    assert_eq!(conn.cached_objects(), 0);
}

#[test]
fn test_deleted_uuid_raises() {
    let (sim, conn) = connect();
    let pattern = conn
        .engine()
        .unwrap()
        .new_pattern_from_events(&[], 16)
        .unwrap();
    let id = pattern.id().unwrap();
    drop(pattern);
    assert!(sim.delete(id));

    // A fresh connection has nothing cached, so it must ask the engine.
    let fresh = Connection::open(sim.clone(), Config::default()).unwrap();
    assert!(matches!(fresh.resolve(id), Err(ProtocolError::Remote(_))));
}

#[test]
fn test_unregistered_class_is_fatal() {
    let (sim, conn) = connect();
    let id = sim.add_foreign("lv2_plugin");
    match conn.resolve(id) {
        Err(ProtocolError::UnknownClass { id: got, class }) => {
            assert_eq!(got, id);
            assert_eq!(class, "lv2_plugin");
        }
        other => panic!("expected UnknownClass, got {:?}", other.map(|p| p.core().class())),
    }
    assert_eq!(conn.cached_objects(), 0);
}

#[test]
fn test_resolve_as_rejects_wrong_proxy_type() {
    let (sim, conn) = connect();
    let err = conn.resolve_as::<Pattern>(sim.engine_id()).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownClass { .. }));
}

#[test]
fn test_instrument_hook_resolves_sound_engine() {
    let (_sim, conn) = connect();
    let scene = conn.engine().unwrap().new_scene().unwrap();
    let layer: Arc<Layer> = scene.add_instrument_layer("fluidsynth").unwrap();
    let before = conn.cached_objects();

    let inst: Arc<Instrument> = layer.instrument().unwrap().expect("instrument");
    // Instrument plus its sound engine.
    assert_eq!(conn.cached_objects(), before + 2);

    let engine = inst.sound_engine().unwrap();
    let again = conn.resolve(engine.id().unwrap()).unwrap();
    assert!(Arc::ptr_eq(&(engine as Arc<dyn Proxy>), &again));
}

#[test]
fn test_failed_hook_leaves_nothing_cached() {
    let (backend, conn) = scripted();
    let id = ObjectId::from_u128(21);
    script_class(&backend, &conn, id, Instrument::CLASS);
    backend.fail(
        &conn.identity_path(id, "/engine/get_uuid"),
        boxwire_types::RemoteError::new("instrument", 1, "engine not ready"),
    );

    let err = conn.resolve(id).unwrap_err();
    assert_eq!(err.to_string(), "engine not ready");
    assert_eq!(conn.cached_objects(), 0);
}

#[test]
fn test_path_proxies_are_not_cached() {
    let (_sim, conn) = connect();
    let master = conn.master().unwrap();
    assert_eq!(master.id(), None);
    assert_eq!(master.core().base_path(), "/master");
    assert_eq!(conn.cached_objects(), 0);
}

#[derive(Debug)]
struct Broken {
    core: ProxyCore,
}

impl Proxy for Broken {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Broken {
    const CLASS: &'static str = "broken";

    fn declare() -> StatusDecl {
        vec![field("owner", TypeDecl::Object("nobody"))]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}

#[test]
fn test_malformed_schema_fails_at_open() {
    let classes = ClassMapBuilder::with_defaults().register::<Broken>();
    let err = Connection::open_with_classes(TestBackend::new(), Config::default(), classes).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Schema(SchemaError::UnknownClass { ref target, .. }) if target == "nobody"
    ));
}

#[test]
fn test_independent_connections_do_not_share_proxies() {
    let (sim, a) = connect();
    let b = Connection::open(sim.clone(), Config::default()).unwrap();
    let pa = a.resolve(sim.engine_id()).unwrap();
    let pb = b.resolve(sim.engine_id()).unwrap();
    assert!(!Arc::ptr_eq(&pa, &pb));
}

#[test]
fn test_proxy_outliving_connection_reports_disconnect() {
    let sim = Arc::new(boxwire_sim::SimEngine::new());
    let conn = Connection::open(sim, Config::default()).unwrap();
    let engine = conn.engine().unwrap();
    drop(conn);
    assert!(matches!(engine.status(), Err(ProtocolError::Disconnected)));
}
