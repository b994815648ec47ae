//! Engine backend trait: the single foreign entry point this layer consumes.
//!
//! `EngineBackend` captures "process one command, possibly emitting callback
//! events" independently of how the engine is reached (a direct in-process
//! call, an OSC frame handler, a simulator). This enables unit testing of the
//! protocol logic without a running engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use boxwire_types::RemoteError;

use crate::wire::{WireEvent, WireValue};

/// Result type for backend operations.
pub type BackendResult<T = Vec<WireEvent>> = Result<T, RemoteError>;

/// Command entry point of an engine.
///
/// Implementations must run the command to completion before returning and
/// return every callback event it produced, in emission order.
pub trait EngineBackend: Send + Sync {
    fn execute(&self, path: &str, type_tags: &str, args: &[WireValue]) -> BackendResult;
}

impl<B: EngineBackend + ?Sized> EngineBackend for Arc<B> {
    fn execute(&self, path: &str, type_tags: &str, args: &[WireValue]) -> BackendResult {
        (**self).execute(path, type_tags, args)
    }
}

// ─── Test Backend ───────────────────────────────────────────────────

/// A command recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub path: String,
    pub type_tags: String,
    pub args: Vec<WireValue>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Events(Vec<WireEvent>),
    Fail(RemoteError),
}

/// A test backend that records every command and replies from a script
/// keyed by exact path. Unscripted paths succeed with no events. Uses
/// `Mutex` for interior mutability so the backend is `Send + Sync`.
#[derive(Default)]
pub struct TestBackend {
    commands: Mutex<Vec<RecordedCommand>>,
    script: Mutex<HashMap<String, Scripted>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `path` with these events.
    pub fn respond(&self, path: &str, events: Vec<WireEvent>) {
        self.script
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Events(events));
    }

    /// Fail `path` with this error record.
    pub fn fail(&self, path: &str, error: RemoteError) {
        self.script
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Fail(error));
    }

    /// Return all recorded commands.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Clear recorded commands.
    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }

    /// Count recorded commands sent to `path`.
    pub fn count(&self, path: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    /// Find the last command sent to `path`.
    pub fn last(&self, path: &str) -> Option<RecordedCommand> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.path == path)
            .cloned()
    }
}

impl EngineBackend for TestBackend {
    fn execute(&self, path: &str, type_tags: &str, args: &[WireValue]) -> BackendResult {
        self.commands.lock().unwrap().push(RecordedCommand {
            path: path.to_string(),
            type_tags: type_tags.to_string(),
            args: args.to_vec(),
        });
        match self.script.lock().unwrap().get(path) {
            Some(Scripted::Events(events)) => Ok(events.clone()),
            Some(Scripted::Fail(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }
}
