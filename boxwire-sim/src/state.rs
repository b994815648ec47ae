//! Object model of the simulated engine.

use std::collections::{BTreeMap, HashMap, VecDeque};

use boxwire_core::wire::{ObjectRecord, WireEvent, WireValue};
use boxwire_types::{ObjectId, PatternEvent, RemoteError};

/// Sound engine types the simulator can instantiate.
pub const ENGINE_TYPES: &[&str] = &["sampler", "fluidsynth", "tonewheel_organ", "stream_player"];

pub(crate) const DOMAIN: &str = "sim";

/// Error codes used by the simulator.
pub mod code {
    pub const BAD_ARGS: i32 = 1;
    pub const NO_SUCH_PATH: i32 = 2;
    pub const NO_SUCH_OBJECT: i32 = 3;
    pub const INVALID: i32 = 4;
}

pub(crate) fn err(code: i32, message: impl Into<String>) -> RemoteError {
    RemoteError::new(DOMAIN, code, message)
}

pub(crate) fn missing(id: ObjectId) -> RemoteError {
    err(code::NO_SUCH_OBJECT, format!("UUID {} not found", id))
}

// ── Event builders ────────────────────────────────────────────────

pub(crate) fn ev(path: &str, args: Vec<WireValue>) -> WireEvent {
    WireEvent::new(path, args)
}

pub(crate) fn s(v: &str) -> WireValue {
    WireValue::Str(v.to_string())
}

pub(crate) fn i(v: i32) -> WireValue {
    WireValue::Int(v)
}

pub(crate) fn f(v: f64) -> WireValue {
    WireValue::Double(v)
}

pub(crate) fn b(v: bool) -> WireValue {
    WireValue::Int(i32::from(v))
}

pub(crate) fn u(id: ObjectId) -> WireValue {
    WireValue::Uuid(*id.as_bytes())
}

pub(crate) fn o(id: ObjectId, class: &str) -> WireValue {
    WireValue::Object(ObjectRecord {
        uuid: *id.as_bytes(),
        class_name: class.to_string(),
    })
}

// ── Objects ───────────────────────────────────────────────────────

pub(crate) struct MasterState {
    pub tempo: f64,
    pub timesig: (i32, i32),
    pub sample_rate: i32,
    pub playing: bool,
    pub pos: i32,
    pub pos_ppqn: i32,
}

/// Ticks per quarter note.
pub(crate) const PPQN: i32 = 48;

impl MasterState {
    fn new() -> Self {
        Self {
            tempo: 120.0,
            timesig: (4, 4),
            sample_rate: 44100,
            playing: false,
            pos: 0,
            pos_ppqn: 0,
        }
    }

    pub fn seek(&mut self, ppqn: i32) {
        self.pos_ppqn = ppqn;
        let samples_per_tick = 60.0 * f64::from(self.sample_rate) / (self.tempo * f64::from(PPQN));
        self.pos = (f64::from(ppqn) * samples_per_tick).round() as i32;
    }

    pub fn status(&self) -> Vec<WireEvent> {
        vec![
            ev("/tempo", vec![f(self.tempo)]),
            ev("/timesig", vec![i(self.timesig.0), i(self.timesig.1)]),
            ev("/sample_rate", vec![i(self.sample_rate)]),
            ev("/playing", vec![b(self.playing)]),
            ev("/pos", vec![i(self.pos)]),
            ev("/pos_ppqn", vec![i(self.pos_ppqn)]),
            ev("/ppqn_factor", vec![i(PPQN)]),
        ]
    }
}

pub(crate) struct EngineState {
    pub scene: ObjectId,
    pub song: ObjectId,
    pub patterns: Vec<ObjectId>,
}

#[derive(Default)]
pub(crate) struct SceneState {
    pub name: String,
    pub title: String,
    pub transpose: i32,
    pub layers: Vec<ObjectId>,
    /// name → instrument, in attach order
    pub instruments: Vec<(String, ObjectId)>,
}

pub(crate) struct LayerState {
    pub enable: bool,
    pub transpose: i32,
    pub low_note: i32,
    pub high_note: i32,
    pub fixed_note: i32,
    pub in_channel: i32,
    pub out_channel: i32,
    pub consume: bool,
    pub ignore_scene_transpose: bool,
    pub instrument: ObjectId,
    pub instrument_name: String,
}

impl LayerState {
    pub fn new(instrument: ObjectId, instrument_name: &str) -> Self {
        Self {
            enable: true,
            transpose: 0,
            low_note: 0,
            high_note: 127,
            fixed_note: -1,
            in_channel: -1,
            out_channel: -1,
            consume: false,
            ignore_scene_transpose: false,
            instrument,
            instrument_name: instrument_name.to_string(),
        }
    }

    /// Integer-valued writable field by wire key. Bools are stored as 0/1.
    pub fn int_field(&mut self, key: &str) -> Option<IntSlot<'_>> {
        Some(match key {
            "enable" => IntSlot::Bool(&mut self.enable),
            "transpose" => IntSlot::Int(&mut self.transpose),
            "low_note" => IntSlot::Int(&mut self.low_note),
            "high_note" => IntSlot::Int(&mut self.high_note),
            "fixed_note" => IntSlot::Int(&mut self.fixed_note),
            "in_channel" => IntSlot::Int(&mut self.in_channel),
            "out_channel" => IntSlot::Int(&mut self.out_channel),
            "consume" => IntSlot::Bool(&mut self.consume),
            "ignore_scene_transpose" => IntSlot::Bool(&mut self.ignore_scene_transpose),
            _ => return None,
        })
    }
}

pub(crate) enum IntSlot<'a> {
    Int(&'a mut i32),
    Bool(&'a mut bool),
}

impl IntSlot<'_> {
    pub fn store(self, v: i32) {
        match self {
            IntSlot::Int(slot) => *slot = v,
            IntSlot::Bool(slot) => *slot = v != 0,
        }
    }
}

pub(crate) struct InstrumentState {
    pub name: String,
    pub engine_type: String,
    pub outputs: i32,
    pub aux_offset: i32,
    pub engine: ObjectId,
}

pub(crate) struct SoundEngineState {
    pub polyphony: i32,
    pub volume: f64,
    pub patches: BTreeMap<i32, String>,
}

impl Default for SoundEngineState {
    fn default() -> Self {
        Self {
            polyphony: 64,
            volume: 1.0,
            patches: BTreeMap::new(),
        }
    }
}

pub(crate) struct PatternState {
    pub name: String,
    pub length: i32,
    pub events: Vec<PatternEvent>,
    pub blob: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct SongState {
    pub tracks: Vec<ObjectId>,
    pub patterns: Vec<ObjectId>,
    pub loop_start: i32,
    pub loop_end: i32,
}

#[derive(Default)]
pub(crate) struct TrackState {
    pub name: String,
    /// (pos, offset, length, pattern)
    pub clips: Vec<(i32, i32, i32, ObjectId)>,
}

pub(crate) enum Object {
    Engine(EngineState),
    Scene(SceneState),
    Layer(LayerState),
    Instrument(InstrumentState),
    SoundEngine(SoundEngineState),
    Pattern(PatternState),
    Song(SongState),
    Track(TrackState),
    /// An object whose class the client may not know about.
    Foreign(String),
}

impl Object {
    pub fn class(&self) -> &str {
        match self {
            Object::Engine(_) => "engine",
            Object::Scene(_) => "scene",
            Object::Layer(_) => "layer",
            Object::Instrument(_) => "instrument",
            Object::SoundEngine(_) => "sound_engine",
            Object::Pattern(_) => "pattern",
            Object::Song(_) => "song",
            Object::Track(_) => "track",
            Object::Foreign(class) => class,
        }
    }
}

// ── Engine state ──────────────────────────────────────────────────

pub(crate) struct State {
    next_id: u128,
    pub objects: HashMap<ObjectId, Object>,
    pub engine: ObjectId,
    pub master: MasterState,
    pub config: BTreeMap<String, BTreeMap<String, String>>,
    pub idle: VecDeque<Vec<WireEvent>>,
    pub saves: usize,
    pub commands: usize,
}

impl State {
    pub fn new() -> Self {
        let mut state = State {
            next_id: 1,
            objects: HashMap::new(),
            engine: ObjectId::NIL,
            master: MasterState::new(),
            config: BTreeMap::new(),
            idle: VecDeque::new(),
            saves: 0,
            commands: 0,
        };
        let scene = state.insert(Object::Scene(SceneState::default()));
        let song = state.insert(Object::Song(SongState::default()));
        state.engine = state.insert(Object::Engine(EngineState {
            scene,
            song,
            patterns: Vec::new(),
        }));
        state
    }

    /// Store an object under the next deterministic id.
    pub fn insert(&mut self, object: Object) -> ObjectId {
        let id = ObjectId::from_u128(0xb0c5_0000_0000_0000_0000_0000_0000_0000 | self.next_id);
        self.next_id += 1;
        log::trace!(target: "sim", "new {} {}", object.class(), id);
        self.objects.insert(id, object);
        id
    }

    /// Remove an object and everything it exclusively owns.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.remove(&id) else {
            return false;
        };
        log::trace!(target: "sim", "deleted {} {}", object.class(), id);
        match object {
            Object::Scene(scene) => {
                for layer in scene.layers {
                    self.remove(layer);
                }
                for (_, inst) in scene.instruments {
                    self.remove(inst);
                }
            }
            Object::Instrument(inst) => {
                self.remove(inst.engine);
            }
            _ => {}
        }
        true
    }

    pub fn status(&self, id: ObjectId) -> Result<Vec<WireEvent>, RemoteError> {
        let object = self.objects.get(&id).ok_or_else(|| missing(id))?;
        Ok(match object {
            Object::Engine(e) => {
                let mut out = vec![
                    ev("/scene", vec![u(e.scene)]),
                    ev("/song", vec![o(e.song, "song")]),
                ];
                out.extend(e.patterns.iter().map(|p| ev("/pattern", vec![u(*p)])));
                out
            }
            Object::Scene(sc) => {
                let mut out = vec![
                    ev("/name", vec![s(&sc.name)]),
                    ev("/title", vec![s(&sc.title)]),
                    ev("/transpose", vec![i(sc.transpose)]),
                ];
                out.extend(sc.layers.iter().map(|l| ev("/layer", vec![o(*l, "layer")])));
                for (name, inst) in &sc.instruments {
                    let engine_type = match self.objects.get(inst) {
                        Some(Object::Instrument(state)) => state.engine_type.as_str(),
                        _ => "",
                    };
                    out.push(ev(
                        "/instrument",
                        vec![s(name), s(engine_type), o(*inst, "instrument")],
                    ));
                }
                out
            }
            Object::Layer(l) => vec![
                ev("/enable", vec![b(l.enable)]),
                ev("/transpose", vec![i(l.transpose)]),
                ev("/low_note", vec![i(l.low_note)]),
                ev("/high_note", vec![i(l.high_note)]),
                ev("/fixed_note", vec![i(l.fixed_note)]),
                ev("/in_channel", vec![i(l.in_channel)]),
                ev("/out_channel", vec![i(l.out_channel)]),
                ev("/consume", vec![b(l.consume)]),
                ev("/ignore_scene_transpose", vec![b(l.ignore_scene_transpose)]),
                ev("/instrument_name", vec![s(&l.instrument_name)]),
                ev("/instrument_uuid", vec![u(l.instrument)]),
            ],
            Object::Instrument(inst) => vec![
                ev("/name", vec![s(&inst.name)]),
                ev("/engine", vec![s(&inst.engine_type)]),
                ev("/outputs", vec![i(inst.outputs)]),
                ev("/aux_offset", vec![i(inst.aux_offset)]),
            ],
            Object::SoundEngine(se) => {
                let mut out = vec![
                    ev("/polyphony", vec![i(se.polyphony)]),
                    ev("/volume", vec![f(se.volume)]),
                    ev("/active_voices", vec![i(0)]),
                ];
                out.extend(
                    se.patches
                        .iter()
                        .map(|(program, name)| ev("/patch", vec![i(*program), s(name)])),
                );
                out
            }
            Object::Pattern(p) => vec![
                ev("/name", vec![s(&p.name)]),
                ev("/length", vec![i(p.length)]),
                ev("/event_count", vec![i(p.events.len() as i32)]),
            ],
            Object::Song(song) => {
                let mut out: Vec<WireEvent> = song
                    .tracks
                    .iter()
                    .map(|t| ev("/track", vec![o(*t, "track")]))
                    .collect();
                for p in &song.patterns {
                    let (name, length) = match self.objects.get(p) {
                        Some(Object::Pattern(state)) => (state.name.as_str(), state.length),
                        _ => ("", 0),
                    };
                    out.push(ev("/pattern", vec![u(*p), s(name), i(length)]));
                }
                out.push(ev("/loop_start", vec![i(song.loop_start)]));
                out.push(ev("/loop_end", vec![i(song.loop_end)]));
                out
            }
            Object::Track(t) => {
                let mut out = vec![ev("/name", vec![s(&t.name)])];
                out.extend(t.clips.iter().map(|(pos, offset, length, pattern)| {
                    ev("/clip", vec![i(*pos), i(*offset), i(*length), u(*pattern)])
                }));
                out
            }
            Object::Foreign(class) => vec![ev("/class", vec![s(class)])],
        })
    }
}
