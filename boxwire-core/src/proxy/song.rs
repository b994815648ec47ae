use std::sync::Arc;

use crate::codec::Arg;
use crate::error::Result;
use crate::schema::{field, StatusDecl, TypeDecl};
use crate::snapshot::FieldValue;

use super::{Pattern, Proxy, ProxyClass, ProxyCore};

/// Arrangement of tracks and the patterns they play.
#[derive(Debug)]
pub struct Song {
    core: ProxyCore,
}

impl Song {
    pub fn set_loop(&self, start: i32, end: i32) -> Result<()> {
        self.set("loop_start", FieldValue::from(start))?;
        self.set("loop_end", FieldValue::from(end))
    }

    pub fn tracks(&self) -> Result<Vec<Arc<Track>>> {
        Ok(self.status()?.objects("tracks"))
    }

    pub fn add_track(&self) -> Result<Arc<Track>> {
        self.core.cmd_makeobj_as("/add_track", Vec::new())
    }

    /// Make a pattern available to this song's clips.
    pub fn add_pattern(&self, pattern: &Pattern) -> Result<()> {
        let id = pattern.core().require_id()?;
        self.cmd("/add_pattern", vec![Arg::from(id)]).map(|_| ())
    }

    pub fn clear(&self) -> Result<()> {
        self.cmd("/clear", Vec::new()).map(|_| ())
    }

    /// Push the edited arrangement to the playback engine.
    pub fn update_playback(&self) -> Result<()> {
        self.cmd("/update_playback", Vec::new()).map(|_| ())
    }
}

impl Proxy for Song {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Song {
    const CLASS: &'static str = "song";

    fn declare() -> StatusDecl {
        vec![
            field("tracks", TypeDecl::list(TypeDecl::Object("track"))),
            field(
                "patterns",
                TypeDecl::list(TypeDecl::Tuple(vec![
                    TypeDecl::Object("pattern"),
                    TypeDecl::Str,
                    TypeDecl::Int,
                ])),
            ),
            field("loop_start", TypeDecl::Int).writable(),
            field("loop_end", TypeDecl::Int).writable(),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}

/// One track of a song: a list of clips.
#[derive(Debug)]
pub struct Track {
    core: ProxyCore,
}

impl Track {
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set("name", FieldValue::from(name))
    }

    /// Place `pattern` at `pos` ticks, starting `offset` ticks into it and
    /// playing for `length` ticks.
    pub fn add_clip(&self, pos: i32, offset: i32, length: i32, pattern: &Pattern) -> Result<()> {
        let id = pattern.core().require_id()?;
        self.cmd(
            "/add_clip",
            vec![Arg::from(pos), Arg::from(offset), Arg::from(length), Arg::from(id)],
        )
        .map(|_| ())
    }

    pub fn clear_clips(&self) -> Result<()> {
        self.cmd("/clear_clips", Vec::new()).map(|_| ())
    }
}

impl Proxy for Track {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Track {
    const CLASS: &'static str = "track";

    fn declare() -> StatusDecl {
        vec![
            field("name", TypeDecl::Str).writable(),
            field(
                "clips",
                TypeDecl::list(TypeDecl::Tuple(vec![
                    TypeDecl::Int,
                    TypeDecl::Int,
                    TypeDecl::Int,
                    TypeDecl::Object("pattern"),
                ])),
            ),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
