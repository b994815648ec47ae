//! Generated setters and the commands they put on the wire.

mod common;

use boxwire_core::{FieldValue, ProtocolError, Proxy, WireEvent, WireValue};
use boxwire_types::ObjectId;

use common::{connect, script_class, scripted};

#[test]
fn test_bool_setter_sends_int() {
    let (backend, conn) = scripted();
    let id = ObjectId::from_u128(3);
    script_class(&backend, &conn, id, "layer");
    let layer = conn.resolve_as::<boxwire_core::Layer>(id).unwrap();
    let enable_path = conn.identity_path(id, "/enable");

    layer.set_enable(true).unwrap();
    let sent = backend.last(&enable_path).unwrap();
    assert_eq!(sent.type_tags, "i");
    assert_eq!(sent.args, vec![WireValue::Int(1)]);

    layer.set_enable(false).unwrap();
    assert_eq!(backend.last(&enable_path).unwrap().args, vec![WireValue::Int(0)]);
}

#[test]
fn test_bool_readback() {
    let (backend, conn) = scripted();
    let id = ObjectId::from_u128(3);
    script_class(&backend, &conn, id, "layer");
    let layer = conn.resolve(id).unwrap();
    let status_path = conn.identity_path(id, "/status");

    backend.respond(&status_path, vec![WireEvent::new("/enable", vec![WireValue::Int(1)])]);
    assert_eq!(layer.status().unwrap().bool("enable"), Some(true));
    backend.respond(&status_path, vec![WireEvent::new("/enable", vec![WireValue::Int(0)])]);
    assert_eq!(layer.status().unwrap().bool("enable"), Some(false));
}

#[test]
fn test_setters_round_trip_through_engine() {
    let (_sim, conn) = connect();
    let scene = conn.engine().unwrap().new_scene().unwrap();
    let layer = scene.add_instrument_layer("sampler").unwrap();

    layer.set_enable(false).unwrap();
    layer.set_range(36, 60).unwrap();
    layer.set("ignore_scene_transpose", FieldValue::from(true)).unwrap();
    let snap = layer.status().unwrap();
    assert_eq!(snap.bool("enable"), Some(false));
    assert_eq!(snap.int("low_note"), Some(36));
    assert_eq!(snap.int("high_note"), Some(60));
    assert_eq!(snap.bool("ignore_scene_transpose"), Some(true));

    scene.set_name("live").unwrap();
    scene.set_transpose(-2).unwrap();
    let snap = scene.status().unwrap();
    assert_eq!(snap.str("name"), Some("live"));
    assert_eq!(snap.int("transpose"), Some(-2));
}

#[test]
fn test_tuple_and_float_setters() {
    let (_sim, conn) = connect();
    let master = conn.master().unwrap();
    master.set_tempo(96.5).unwrap();
    master.set_timesig(7, 8).unwrap();
    // Integral value for a float field is widened before sending.
    master.set("tempo", FieldValue::from(100)).unwrap();

    let snap = master.status().unwrap();
    assert_eq!(snap.float("tempo"), Some(100.0));
    assert_eq!(snap.get("timesig"), Some(&FieldValue::from((7, 8))));
}

#[test]
fn test_read_only_and_unknown_fields_are_rejected_locally() {
    let (backend, conn) = scripted();
    let master = conn.master().unwrap();
    assert!(matches!(
        master.set("sample_rate", FieldValue::from(48000)),
        Err(ProtocolError::NotWritable { .. })
    ));
    assert!(matches!(
        master.set("tempi", FieldValue::from(1.0)),
        Err(ProtocolError::UnknownField { .. })
    ));
    assert!(matches!(
        master.set("timesig", FieldValue::from(4)),
        Err(ProtocolError::Coerce { .. })
    ));
    assert!(backend.commands().is_empty());
}

#[test]
fn test_transport_commands() {
    let (_sim, conn) = connect();
    let master = conn.master().unwrap();
    master.play().unwrap();
    master.seek_ppqn(96).unwrap();
    let snap = master.status().unwrap();
    assert_eq!(snap.bool("playing"), Some(true));
    assert_eq!(snap.int("pos_ppqn"), Some(96));
    // 2 beats at 120 bpm and 44.1 kHz
    assert_eq!(snap.int("pos"), Some(44100));
    master.stop().unwrap();
    assert_eq!(master.status().unwrap().bool("playing"), Some(false));
}

#[test]
fn test_sound_engine_setters() {
    let (_sim, conn) = connect();
    let scene = conn.engine().unwrap().new_scene().unwrap();
    let layer = scene.add_instrument_layer("fluidsynth").unwrap();
    let engine = layer.instrument().unwrap().unwrap().sound_engine().unwrap();

    engine.set_polyphony(16).unwrap();
    engine.set_volume(0.5).unwrap();
    let snap = engine.status().unwrap();
    assert_eq!(snap.int("polyphony"), Some(16));
    assert_eq!(snap.float("volume"), Some(0.5));

    let err = engine.set_polyphony(0).unwrap_err();
    assert_eq!(err.to_string(), "Polyphony 0 out of range 1..256");
}
