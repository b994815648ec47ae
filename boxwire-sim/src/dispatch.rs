//! Command handlers of the simulated engine.

use boxwire_core::wire::{WireEvent, WireValue};
use boxwire_types::{decode_events, path, ObjectId, RemoteError};

use crate::state::{
    code, err, ev, missing, s, u, InstrumentState, LayerState, Object, PatternState, SceneState,
    SoundEngineState, State, TrackState, ENGINE_TYPES,
};

type Reply = Result<Vec<WireEvent>, RemoteError>;

macro_rules! obj_mut {
    ($state:expr, $id:expr, $variant:ident) => {
        match $state.objects.get_mut(&$id) {
            Some(Object::$variant(o)) => o,
            _ => return Err(missing($id)),
        }
    };
}

/// Typed view over one command's arguments.
struct Args<'a> {
    path: &'a str,
    args: &'a [WireValue],
}

impl<'a> Args<'a> {
    /// Reject the call unless its tag string is exactly `want`.
    fn expect(path: &'a str, tags: &str, want: &str, args: &'a [WireValue]) -> Result<Self, RemoteError> {
        if tags != want {
            return Err(err(
                code::BAD_ARGS,
                format!("{}: expected arguments '{}', got '{}'", path, want, tags),
            ));
        }
        Ok(Args { path, args })
    }

    fn bad(&self, index: usize) -> RemoteError {
        err(code::BAD_ARGS, format!("{}: bad argument {}", self.path, index))
    }

    fn int(&self, index: usize) -> Result<i32, RemoteError> {
        match self.args.get(index) {
            Some(WireValue::Int(v)) => Ok(*v),
            _ => Err(self.bad(index)),
        }
    }

    fn double(&self, index: usize) -> Result<f64, RemoteError> {
        match self.args.get(index) {
            Some(WireValue::Double(v)) => Ok(*v),
            _ => Err(self.bad(index)),
        }
    }

    fn str(&self, index: usize) -> Result<&'a str, RemoteError> {
        match self.args.get(index) {
            Some(WireValue::Str(v)) => Ok(v),
            _ => Err(self.bad(index)),
        }
    }

    fn blob(&self, index: usize) -> Result<&'a [u8], RemoteError> {
        match self.args.get(index) {
            Some(WireValue::Blob(v)) => Ok(v),
            _ => Err(self.bad(index)),
        }
    }

    fn uuid(&self, index: usize) -> Result<ObjectId, RemoteError> {
        match self.args.get(index) {
            Some(WireValue::Uuid(v)) => Ok(ObjectId::from_bytes(*v)),
            _ => Err(self.bad(index)),
        }
    }
}

/// `path` relative to `prefix`, if `path` is `prefix` or below it.
fn under<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn unknown(path: &str) -> RemoteError {
    err(code::NO_SUCH_PATH, format!("Unknown command: {}", path))
}

fn created(id: ObjectId) -> Reply {
    Ok(vec![ev("/uuid", vec![u(id)])])
}

impl State {
    pub fn execute(&mut self, namespace: &str, full: &str, tags: &str, args: &[WireValue]) -> Reply {
        self.commands += 1;
        if let Some((id, rel)) = path::split_identity_path(namespace, full) {
            return self.object_cmd(id, rel, tags, args);
        }
        if full == "/on_idle" {
            Args::expect(full, tags, "", args)?;
            return Ok(self.idle.pop_front().unwrap_or_default());
        }
        if let Some(rel) = under(full, "/engine") {
            return self.object_cmd(self.engine, rel, tags, args);
        }
        if let Some(rel) = under(full, "/master") {
            return self.master_cmd(rel, tags, args);
        }
        if let Some(rel) = under(full, "/config") {
            return self.config_cmd(rel, tags, args);
        }
        Err(unknown(full))
    }

    fn master_cmd(&mut self, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let m = &mut self.master;
        match rel {
            "/status" => {
                Args::expect(rel, tags, "", args)?;
                return Ok(m.status());
            }
            "/tempo" => {
                let tempo = Args::expect(rel, tags, "f", args)?.double(0)?;
                if tempo <= 0.0 {
                    return Err(err(code::INVALID, format!("Invalid tempo {}", tempo)));
                }
                m.tempo = tempo;
            }
            "/timesig" => {
                let a = Args::expect(rel, tags, "ii", args)?;
                m.timesig = (a.int(0)?, a.int(1)?);
            }
            "/play" => {
                Args::expect(rel, tags, "", args)?;
                m.playing = true;
            }
            "/stop" => {
                Args::expect(rel, tags, "", args)?;
                m.playing = false;
            }
            "/seek_ppqn" => {
                let ppqn = Args::expect(rel, tags, "i", args)?.int(0)?;
                m.seek(ppqn);
            }
            _ => return Err(unknown(rel)),
        }
        Ok(Vec::new())
    }

    fn config_cmd(&mut self, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        match rel {
            "/status" => {
                Args::expect(rel, tags, "", args)?;
                Ok(Vec::new())
            }
            "/get" => {
                let a = Args::expect(rel, tags, "ss", args)?;
                let (section, key) = (a.str(0)?, a.str(1)?);
                let value = self.config.get(section).and_then(|sec| sec.get(key));
                Ok(value.map(|v| vec![ev("/value", vec![s(v)])]).unwrap_or_default())
            }
            "/set" => {
                let a = Args::expect(rel, tags, "sss", args)?;
                self.config
                    .entry(a.str(0)?.to_string())
                    .or_default()
                    .insert(a.str(1)?.to_string(), a.str(2)?.to_string());
                Ok(Vec::new())
            }
            "/delete" => {
                let a = Args::expect(rel, tags, "ss", args)?;
                if let Some(sec) = self.config.get_mut(a.str(0)?) {
                    sec.remove(a.str(1)?);
                    if sec.is_empty() {
                        self.config.remove(a.str(0)?);
                    }
                }
                Ok(Vec::new())
            }
            "/keys" => {
                let a = Args::expect(rel, tags, "s", args)?;
                Ok(self
                    .config
                    .get(a.str(0)?)
                    .map(|sec| sec.keys().map(|k| ev("/key", vec![s(k)])).collect())
                    .unwrap_or_default())
            }
            "/sections" => {
                let prefix = Args::expect(rel, tags, "s", args)?.str(0)?;
                Ok(self
                    .config
                    .keys()
                    .filter(|name| name.starts_with(prefix))
                    .map(|name| ev("/section", vec![s(name)]))
                    .collect())
            }
            "/save" => {
                Args::expect(rel, tags, "", args)?;
                self.saves += 1;
                Ok(Vec::new())
            }
            _ => Err(unknown(rel)),
        }
    }

    fn object_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let class = self.objects.get(&id).ok_or_else(|| missing(id))?.class().to_string();
        match rel {
            "/get_class_name" => {
                Args::expect(rel, tags, "", args)?;
                return Ok(vec![ev("/class_name", vec![s(&class)])]);
            }
            "/get_uuid" => {
                Args::expect(rel, tags, "", args)?;
                return Ok(vec![ev("/uuid", vec![u(id)])]);
            }
            "/status" => {
                Args::expect(rel, tags, "", args)?;
                return self.status(id);
            }
            _ => {}
        }
        match class.as_str() {
            "engine" => self.engine_cmd(id, rel, tags, args),
            "scene" => self.scene_cmd(id, rel, tags, args),
            "layer" => self.layer_cmd(id, rel, tags, args),
            "instrument" => self.instrument_cmd(id, rel, tags, args),
            "sound_engine" => self.sound_engine_cmd(id, rel, tags, args),
            "pattern" => self.pattern_cmd(id, rel, tags, args),
            "song" => self.song_cmd(id, rel, tags, args),
            "track" => self.track_cmd(id, rel, tags, args),
            _ => Err(unknown(rel)),
        }
    }

    fn engine_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        match rel {
            "/new_scene" => {
                Args::expect(rel, tags, "", args)?;
                created(self.insert(Object::Scene(SceneState::default())))
            }
            "/new_pattern" => {
                let a = Args::expect(rel, tags, "bi", args)?;
                let blob = a.blob(0)?;
                let length = a.int(1)?;
                if length <= 0 {
                    return Err(err(code::INVALID, format!("Invalid pattern length {}", length)));
                }
                let events = decode_events(blob).map_err(|e| err(code::BAD_ARGS, e.to_string()))?;
                let pattern = self.insert(Object::Pattern(PatternState {
                    name: String::new(),
                    length,
                    events,
                    blob: blob.to_vec(),
                }));
                obj_mut!(self, id, Engine).patterns.push(pattern);
                created(pattern)
            }
            _ => Err(unknown(rel)),
        }
    }

    fn scene_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        match rel {
            "/name" => {
                let v = Args::expect(rel, tags, "s", args)?.str(0)?;
                obj_mut!(self, id, Scene).name = v.to_string();
            }
            "/title" => {
                let v = Args::expect(rel, tags, "s", args)?.str(0)?;
                obj_mut!(self, id, Scene).title = v.to_string();
            }
            "/transpose" => {
                let v = Args::expect(rel, tags, "i", args)?.int(0)?;
                obj_mut!(self, id, Scene).transpose = v;
            }
            "/clear" => {
                Args::expect(rel, tags, "", args)?;
                self.clear_scene(id)?;
            }
            "/load" => {
                let name = Args::expect(rel, tags, "s", args)?.str(0)?;
                if name.is_empty() {
                    return Err(err(code::INVALID, "Scene name must not be empty"));
                }
                self.clear_scene(id)?;
                let scene = obj_mut!(self, id, Scene);
                scene.name = name.to_string();
                scene.title = name.to_string();
            }
            "/add_layer" => {
                let a = Args::expect(rel, tags, "is", args)?;
                let pos = a.int(0)?;
                let name = a.str(1)?;
                let scene = obj_mut!(self, id, Scene);
                let Some(&(_, inst)) = scene.instruments.iter().find(|(n, _)| n == name) else {
                    return Err(err(code::INVALID, format!("Instrument '{}' not found", name)));
                };
                let layer = self.insert(Object::Layer(LayerState::new(inst, name)));
                let scene = obj_mut!(self, id, Scene);
                let at = usize::try_from(pos).unwrap_or(0).min(scene.layers.len());
                scene.layers.insert(at, layer);
                return created(layer);
            }
            "/add_instrument_layer" => {
                let engine_type = Args::expect(rel, tags, "s", args)?.str(0)?;
                if !ENGINE_TYPES.contains(&engine_type) {
                    return Err(err(code::INVALID, format!("No engine called '{}'", engine_type)));
                }
                let name = {
                    let scene = obj_mut!(self, id, Scene);
                    let mut n = scene.instruments.len() + 1;
                    while scene
                        .instruments
                        .iter()
                        .any(|(existing, _)| *existing == format!("{}{}", engine_type, n))
                    {
                        n += 1;
                    }
                    format!("{}{}", engine_type, n)
                };
                let engine = self.insert(Object::SoundEngine(SoundEngineState::default()));
                let inst = self.insert(Object::Instrument(InstrumentState {
                    name: name.clone(),
                    engine_type: engine_type.to_string(),
                    outputs: 1,
                    aux_offset: 0,
                    engine,
                }));
                let layer = self.insert(Object::Layer(LayerState::new(inst, &name)));
                let scene = obj_mut!(self, id, Scene);
                scene.instruments.push((name, inst));
                scene.layers.push(layer);
                return created(layer);
            }
            "/move_layer" => {
                let a = Args::expect(rel, tags, "ii", args)?;
                let (from, to) = (a.int(0)?, a.int(1)?);
                let scene = obj_mut!(self, id, Scene);
                let len = scene.layers.len();
                let index = |v: i32| usize::try_from(v).ok().filter(|&i| i < len);
                let (Some(from), Some(to)) = (index(from), index(to)) else {
                    return Err(err(code::INVALID, format!("Layer position out of range (0..{})", len)));
                };
                let layer = scene.layers.remove(from);
                scene.layers.insert(to, layer);
            }
            "/delete_layer" => {
                let pos = Args::expect(rel, tags, "i", args)?.int(0)?;
                let scene = obj_mut!(self, id, Scene);
                let Some(at) = usize::try_from(pos).ok().filter(|&i| i < scene.layers.len()) else {
                    return Err(err(code::INVALID, format!("No layer at position {}", pos)));
                };
                let layer = scene.layers.remove(at);
                self.remove(layer);
            }
            _ => return Err(unknown(rel)),
        }
        Ok(Vec::new())
    }

    fn clear_scene(&mut self, id: ObjectId) -> Result<(), RemoteError> {
        let scene = obj_mut!(self, id, Scene);
        let layers = std::mem::take(&mut scene.layers);
        let instruments = std::mem::take(&mut scene.instruments);
        for layer in layers {
            self.remove(layer);
        }
        for (_, inst) in instruments {
            self.remove(inst);
        }
        Ok(())
    }

    fn layer_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let key = rel.strip_prefix('/').unwrap_or(rel);
        let layer = obj_mut!(self, id, Layer);
        let Some(slot) = layer.int_field(key) else {
            return Err(unknown(rel));
        };
        let v = Args::expect(rel, tags, "i", args)?.int(0)?;
        slot.store(v);
        Ok(Vec::new())
    }

    fn instrument_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let inst = obj_mut!(self, id, Instrument);
        match rel {
            "/engine/get_uuid" => {
                Args::expect(rel, tags, "", args)?;
                Ok(vec![ev("/uuid", vec![u(inst.engine)])])
            }
            _ => Err(unknown(rel)),
        }
    }

    fn sound_engine_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let se = obj_mut!(self, id, SoundEngine);
        match rel {
            "/polyphony" => {
                let v = Args::expect(rel, tags, "i", args)?.int(0)?;
                if !(1..=256).contains(&v) {
                    return Err(err(code::INVALID, format!("Polyphony {} out of range 1..256", v)));
                }
                se.polyphony = v;
            }
            "/volume" => se.volume = Args::expect(rel, tags, "f", args)?.double(0)?,
            "/set_patch" => {
                let a = Args::expect(rel, tags, "is", args)?;
                se.patches.insert(a.int(0)?, a.str(1)?.to_string());
            }
            _ => return Err(unknown(rel)),
        }
        Ok(Vec::new())
    }

    fn pattern_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        let p = obj_mut!(self, id, Pattern);
        match rel {
            "/name" => {
                p.name = Args::expect(rel, tags, "s", args)?.str(0)?.to_string();
                Ok(Vec::new())
            }
            "/blob" => {
                Args::expect(rel, tags, "", args)?;
                Ok(vec![ev("/blob", vec![WireValue::Blob(p.blob.clone())])])
            }
            _ => Err(unknown(rel)),
        }
    }

    fn ensure_pattern(&self, id: ObjectId) -> Result<(), RemoteError> {
        match self.objects.get(&id) {
            Some(Object::Pattern(_)) => Ok(()),
            Some(other) => Err(err(
                code::INVALID,
                format!("{} is a {}, not a pattern", id, other.class()),
            )),
            None => Err(missing(id)),
        }
    }

    fn song_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        match rel {
            "/add_track" => {
                Args::expect(rel, tags, "", args)?;
                let track = self.insert(Object::Track(TrackState::default()));
                obj_mut!(self, id, Song).tracks.push(track);
                return created(track);
            }
            "/add_pattern" => {
                let pattern = Args::expect(rel, tags, "u", args)?.uuid(0)?;
                self.ensure_pattern(pattern)?;
                let song = obj_mut!(self, id, Song);
                if !song.patterns.contains(&pattern) {
                    song.patterns.push(pattern);
                }
            }
            "/clear" => {
                Args::expect(rel, tags, "", args)?;
                let song = obj_mut!(self, id, Song);
                song.patterns.clear();
                for track in std::mem::take(&mut song.tracks) {
                    self.remove(track);
                }
            }
            "/update_playback" => {
                Args::expect(rel, tags, "", args)?;
                log::debug!(target: "sim", "song {} playback updated", id);
            }
            "/loop_start" => {
                let v = Args::expect(rel, tags, "i", args)?.int(0)?;
                obj_mut!(self, id, Song).loop_start = v;
            }
            "/loop_end" => {
                let v = Args::expect(rel, tags, "i", args)?.int(0)?;
                obj_mut!(self, id, Song).loop_end = v;
            }
            _ => return Err(unknown(rel)),
        }
        Ok(Vec::new())
    }

    fn track_cmd(&mut self, id: ObjectId, rel: &str, tags: &str, args: &[WireValue]) -> Reply {
        match rel {
            "/name" => {
                let v = Args::expect(rel, tags, "s", args)?.str(0)?;
                obj_mut!(self, id, Track).name = v.to_string();
            }
            "/add_clip" => {
                let a = Args::expect(rel, tags, "iiiu", args)?;
                let clip = (a.int(0)?, a.int(1)?, a.int(2)?, a.uuid(3)?);
                self.ensure_pattern(clip.3)?;
                obj_mut!(self, id, Track).clips.push(clip);
            }
            "/clear_clips" => {
                Args::expect(rel, tags, "", args)?;
                obj_mut!(self, id, Track).clips.clear();
            }
            _ => return Err(unknown(rel)),
        }
        Ok(Vec::new())
    }
}
