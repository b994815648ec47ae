use std::sync::Arc;

use boxwire_types::{encode_events, PatternEvent};

use crate::codec::Arg;
use crate::error::Result;
use crate::schema::{field, StatusDecl, TypeDecl};

use super::{Pattern, Proxy, ProxyClass, ProxyCore, Scene, Song};

/// Root dispatch object of the engine.
#[derive(Debug)]
pub struct Engine {
    core: ProxyCore,
}

impl Engine {
    /// The scene currently routed to the engine's outputs.
    pub fn scene(&self) -> Result<Option<Arc<Scene>>> {
        Ok(self.status()?.object("scene"))
    }

    pub fn song(&self) -> Result<Option<Arc<Song>>> {
        Ok(self.status()?.object("song"))
    }

    pub fn patterns(&self) -> Result<Vec<Arc<Pattern>>> {
        Ok(self.status()?.objects("patterns"))
    }

    pub fn new_scene(&self) -> Result<Arc<Scene>> {
        self.core.cmd_makeobj_as("/new_scene", Vec::new())
    }

    /// Submit an encoded pattern blob with a loop length in ticks.
    pub fn new_pattern(&self, blob: Vec<u8>, length: u32) -> Result<Arc<Pattern>> {
        self.core
            .cmd_makeobj_as("/new_pattern", vec![Arg::from(blob), Arg::from(length)])
    }

    pub fn new_pattern_from_events(&self, events: &[PatternEvent], length: u32) -> Result<Arc<Pattern>> {
        self.new_pattern(encode_events(events), length)
    }
}

impl Proxy for Engine {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Engine {
    const CLASS: &'static str = "engine";

    fn declare() -> StatusDecl {
        vec![
            field("scene", TypeDecl::Object("scene")),
            field("song", TypeDecl::Object("song")),
            field("patterns", TypeDecl::list(TypeDecl::Object("pattern"))),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
