use std::sync::{Arc, OnceLock};

use crate::codec::Arg;
use crate::error::Result;
use crate::schema::{field, StatusDecl, TypeDecl};
use crate::snapshot::FieldValue;

use super::{Proxy, ProxyClass, ProxyCore};

/// An instrument attached to a scene. Owns exactly one sound engine,
/// resolved as soon as the instrument is first seen.
#[derive(Debug)]
pub struct Instrument {
    core: ProxyCore,
    sound_engine: OnceLock<Arc<SoundEngine>>,
}

impl Instrument {
    /// The sound engine behind this instrument.
    pub fn sound_engine(&self) -> Result<Arc<SoundEngine>> {
        if let Some(e) = self.sound_engine.get() {
            return Ok(e.clone());
        }
        let engine = self.resolve_sound_engine()?;
        Ok(self.sound_engine.get_or_init(|| engine).clone())
    }

    fn resolve_sound_engine(&self) -> Result<Arc<SoundEngine>> {
        let conn = self.core.connection()?;
        let id = conn.get_uuid(&boxwire_types::path::join(self.core.base_path(), "/engine"))?;
        conn.resolve_as(id)
    }
}

impl Proxy for Instrument {
    fn core(&self) -> &ProxyCore {
        &self.core
    }

    fn after_resolve(&self) -> Result<()> {
        let engine = self.resolve_sound_engine()?;
        self.sound_engine.get_or_init(|| engine);
        Ok(())
    }
}

impl ProxyClass for Instrument {
    const CLASS: &'static str = "instrument";

    fn declare() -> StatusDecl {
        vec![
            field("name", TypeDecl::Str),
            field("engine", TypeDecl::Str),
            field("outputs", TypeDecl::Int),
            field("aux_offset", TypeDecl::Int),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self {
            core,
            sound_engine: OnceLock::new(),
        }
    }
}

/// Synthesis engine inside an instrument.
#[derive(Debug)]
pub struct SoundEngine {
    core: ProxyCore,
}

impl SoundEngine {
    pub fn set_polyphony(&self, voices: i32) -> Result<()> {
        self.set("polyphony", FieldValue::from(voices))
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.set("volume", FieldValue::from(volume))
    }

    /// Store a patch name under a program number.
    pub fn set_patch(&self, program: i32, name: &str) -> Result<()> {
        self.cmd("/set_patch", vec![Arg::from(program), Arg::from(name)])
            .map(|_| ())
    }
}

impl Proxy for SoundEngine {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for SoundEngine {
    const CLASS: &'static str = "sound_engine";

    fn declare() -> StatusDecl {
        vec![
            field("polyphony", TypeDecl::Int).writable(),
            field("volume", TypeDecl::Float).writable(),
            field("active_voices", TypeDecl::Int),
            field("patches", TypeDecl::dict(TypeDecl::Int, vec![TypeDecl::Str])),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
