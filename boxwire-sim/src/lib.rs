//! # boxwire-sim
//!
//! A deterministic, in-process stand-in for the audio engine. It implements
//! the command namespace the boxwire proxies speak (`/master`, `/config`,
//! `/engine` and identity-addressed objects under `/doc/uuid`) without any
//! signal processing, so protocol behaviour can be exercised in tests and
//! from the probe binary.
//!
//! Object ids are allocated sequentially, so two simulators built the same
//! way hand out the same ids.

mod dispatch;
mod state;

use std::sync::{Mutex, MutexGuard};

use boxwire_core::backend::{BackendResult, EngineBackend};
use boxwire_core::wire::{WireEvent, WireValue};
use boxwire_types::ObjectId;

pub use state::{code, ENGINE_TYPES};

use state::{Object, State};

pub const DEFAULT_NAMESPACE: &str = "/doc/uuid";

pub struct SimEngine {
    namespace: String,
    state: Mutex<State>,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Simulator answering identity paths under a custom namespace.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            state: Mutex::new(State::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Identity of the root engine object.
    pub fn engine_id(&self) -> ObjectId {
        self.lock().engine
    }

    /// Queue one batch of unsolicited events for the next idle drain.
    pub fn inject(&self, events: Vec<WireEvent>) {
        self.lock().idle.push_back(events);
    }

    /// Delete an object as if the engine had destroyed it.
    pub fn delete(&self, id: ObjectId) -> bool {
        self.lock().remove(id)
    }

    /// Create an object of a class the client has no proxy for.
    pub fn add_foreign(&self, class: &str) -> ObjectId {
        self.lock().insert(Object::Foreign(class.to_string()))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.lock().objects.contains_key(&id)
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Number of times the configuration store was saved.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// Number of commands executed so far.
    pub fn commands_run(&self) -> usize {
        self.lock().commands
    }
}

impl EngineBackend for SimEngine {
    fn execute(&self, path: &str, type_tags: &str, args: &[WireValue]) -> BackendResult {
        log::trace!(target: "sim", "{} ,{}", path, type_tags);
        let result = self.lock().execute(&self.namespace, path, type_tags, args);
        if let Err(e) = &result {
            log::debug!(target: "sim", "{} failed: {}", path, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxwire_types::{encode_events, path, PatternEvent};

    fn id_path(id: ObjectId, rel: &str) -> String {
        path::identity_path(DEFAULT_NAMESPACE, id, rel)
    }

    fn uuid_of(events: &[WireEvent]) -> ObjectId {
        match events.iter().find(|e| e.path == "/uuid").map(|e| &e.args[0]) {
            Some(WireValue::Uuid(bytes)) => ObjectId::from_bytes(*bytes),
            other => panic!("no uuid in {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_deterministic() {
        assert_eq!(SimEngine::new().engine_id(), SimEngine::new().engine_id());
    }

    #[test]
    fn test_reports_class_names() {
        let sim = SimEngine::new();
        let events = sim
            .execute(&id_path(sim.engine_id(), "/get_class_name"), "", &[])
            .unwrap();
        assert_eq!(events[0].args, vec![WireValue::Str("engine".into())]);
    }

    #[test]
    fn test_rejects_wrong_argument_tags() {
        let sim = SimEngine::new();
        let err = sim
            .execute("/master/tempo", "i", &[WireValue::Int(120)])
            .unwrap_err();
        assert_eq!(err.code, code::BAD_ARGS);
    }

    #[test]
    fn test_unknown_paths_and_ids_fail() {
        let sim = SimEngine::new();
        assert_eq!(sim.execute("/nowhere", "", &[]).unwrap_err().code, code::NO_SUCH_PATH);
        assert_eq!(sim.execute("/masterful", "", &[]).unwrap_err().code, code::NO_SUCH_PATH);
        let ghost = ObjectId::from_u128(42);
        assert_eq!(
            sim.execute(&id_path(ghost, "/status"), "", &[]).unwrap_err().code,
            code::NO_SUCH_OBJECT
        );
    }

    #[test]
    fn test_pattern_blob_is_parsed() {
        let sim = SimEngine::new();
        let blob = encode_events(&[
            PatternEvent::note_on(0, 0, 36, 100),
            PatternEvent::note_off(10, 0, 36, 100),
        ]);
        let created = sim
            .execute(
                &id_path(sim.engine_id(), "/new_pattern"),
                "bi",
                &[WireValue::Blob(blob), WireValue::Int(16)],
            )
            .unwrap();
        let status = sim
            .execute(&id_path(uuid_of(&created), "/status"), "", &[])
            .unwrap();
        assert!(status.contains(&WireEvent::new("/event_count", vec![WireValue::Int(2)])));
        assert!(status.contains(&WireEvent::new("/length", vec![WireValue::Int(16)])));
    }

    #[test]
    fn test_truncated_pattern_blob_is_rejected() {
        let sim = SimEngine::new();
        let err = sim
            .execute(
                &id_path(sim.engine_id(), "/new_pattern"),
                "bi",
                &[WireValue::Blob(vec![0; 5]), WireValue::Int(16)],
            )
            .unwrap_err();
        assert_eq!(err.code, code::BAD_ARGS);
    }

    #[test]
    fn test_deleting_a_scene_removes_its_layers() {
        let sim = SimEngine::new();
        let scene = uuid_of(&sim.execute(&id_path(sim.engine_id(), "/new_scene"), "", &[]).unwrap());
        let layer = uuid_of(
            &sim.execute(
                &id_path(scene, "/add_instrument_layer"),
                "s",
                &[WireValue::Str("sampler".into())],
            )
            .unwrap(),
        );
        assert!(sim.contains(layer));
        assert!(sim.delete(scene));
        assert!(!sim.contains(layer));
        assert!(!sim.delete(scene));
    }

    #[test]
    fn test_idle_drains_one_batch_per_call() {
        let sim = SimEngine::new();
        sim.inject(vec![WireEvent::new("/midi/note", vec![WireValue::Int(60)])]);
        assert_eq!(sim.execute("/on_idle", "", &[]).unwrap().len(), 1);
        assert!(sim.execute("/on_idle", "", &[]).unwrap().is_empty());
    }
}
