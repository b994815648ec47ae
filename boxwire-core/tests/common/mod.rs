#![allow(dead_code)]
//! Test harness utilities for boxwire-core integration tests.

use std::sync::Arc;

use boxwire_core::{Config, Connection, TestBackend, WireEvent, WireValue};
use boxwire_sim::SimEngine;
use boxwire_types::ObjectId;

/// A connection to a fresh simulated engine, with the simulator kept for
/// direct inspection.
pub fn connect() -> (Arc<SimEngine>, Arc<Connection>) {
    let sim = Arc::new(SimEngine::new());
    let conn = Connection::open(sim.clone(), Config::default()).expect("open connection");
    (sim, conn)
}

/// A connection to a scripted recording backend.
pub fn scripted() -> (Arc<TestBackend>, Arc<Connection>) {
    let backend = Arc::new(TestBackend::new());
    let conn = Connection::open(backend.clone(), Config::default()).expect("open connection");
    (backend, conn)
}

/// Script `id` to report `class` when asked for its class name.
pub fn script_class(backend: &TestBackend, conn: &Connection, id: ObjectId, class: &str) {
    backend.respond(
        &conn.identity_path(id, "/get_class_name"),
        vec![WireEvent::new("/class_name", vec![WireValue::Str(class.into())])],
    );
}

pub fn uuid_arg(id: ObjectId) -> WireValue {
    WireValue::Uuid(*id.as_bytes())
}
