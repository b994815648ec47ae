//! Draining unsolicited events.

mod common;

use boxwire_core::{Config, Connection, WireEvent, WireValue};
use boxwire_sim::SimEngine;
use boxwire_types::Value;

use common::{connect, scripted};

fn note(pitch: i32) -> Vec<WireEvent> {
    vec![WireEvent::new("/io/midi/note_on", vec![WireValue::Int(pitch)])]
}

#[test]
fn test_idle_drains_every_queued_batch_in_order() {
    let (sim, conn) = connect();
    sim.inject(note(60));
    sim.inject(note(64));

    let events = conn.idle().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].args, vec![Value::Int(60)]);
    assert_eq!(events[1].args, vec![Value::Int(64)]);
    assert!(conn.idle().unwrap().is_empty());
}

#[test]
fn test_idle_respects_batch_limit() {
    let config = Config::from_toml_str("[protocol]\nmax_idle_batches = 2\n").unwrap();
    let sim = std::sync::Arc::new(SimEngine::new());
    let conn = Connection::open(sim.clone(), config).unwrap();
    for pitch in 0..5 {
        sim.inject(note(pitch));
    }
    assert_eq!(conn.idle().unwrap().len(), 2);
    assert_eq!(conn.idle().unwrap().len(), 2);
    assert_eq!(conn.idle().unwrap().len(), 1);
}

#[test]
fn test_idle_command_is_configurable() {
    let (backend, _) = scripted();
    let config = Config::from_toml_str("[protocol]\nidle_command = \"/drain\"\n").unwrap();
    let conn = Connection::open(backend.clone(), config).unwrap();
    conn.idle().unwrap();
    assert_eq!(backend.count("/drain"), 1);
    assert_eq!(backend.count("/on_idle"), 0);
}
