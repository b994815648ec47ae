use crate::codec::Arg;
use crate::error::Result;
use crate::schema::{field, StatusDecl, TypeDecl};
use crate::snapshot::FieldValue;

use super::{Proxy, ProxyClass, ProxyCore};

/// Transport and timing state, bound to `/master`.
#[derive(Debug)]
pub struct Master {
    core: ProxyCore,
}

impl Master {
    pub fn set_tempo(&self, bpm: f64) -> Result<()> {
        self.set("tempo", FieldValue::from(bpm))
    }

    pub fn set_timesig(&self, numerator: i32, denominator: i32) -> Result<()> {
        self.set("timesig", FieldValue::from((numerator, denominator)))
    }

    pub fn play(&self) -> Result<()> {
        self.cmd("/play", Vec::new()).map(|_| ())
    }

    pub fn stop(&self) -> Result<()> {
        self.cmd("/stop", Vec::new()).map(|_| ())
    }

    /// Move the playhead to an absolute position in ticks.
    pub fn seek_ppqn(&self, ppqn: i32) -> Result<()> {
        self.cmd("/seek_ppqn", vec![Arg::from(ppqn)]).map(|_| ())
    }
}

impl Proxy for Master {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Master {
    const CLASS: &'static str = "master";

    fn declare() -> StatusDecl {
        vec![
            field("tempo", TypeDecl::Float).writable(),
            field("timesig", TypeDecl::Tuple(vec![TypeDecl::Int, TypeDecl::Int])).writable(),
            field("sample_rate", TypeDecl::Int),
            field("playing", TypeDecl::Bool),
            field("pos", TypeDecl::Int),
            field("pos_ppqn", TypeDecl::Int),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
