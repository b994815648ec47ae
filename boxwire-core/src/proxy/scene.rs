use std::sync::Arc;

use crate::codec::Arg;
use crate::error::Result;
use crate::schema::{field, StatusDecl, TypeDecl};
use crate::snapshot::FieldValue;

use super::{Instrument, Proxy, ProxyClass, ProxyCore};

/// A set of layers routing input to instruments.
#[derive(Debug)]
pub struct Scene {
    core: ProxyCore,
}

impl Scene {
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set("name", FieldValue::from(name))
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.set("title", FieldValue::from(title))
    }

    pub fn set_transpose(&self, semitones: i32) -> Result<()> {
        self.set("transpose", FieldValue::from(semitones))
    }

    pub fn layers(&self) -> Result<Vec<Arc<Layer>>> {
        Ok(self.status()?.objects("layers"))
    }

    /// Instrument attached to this scene under `name`.
    pub fn instrument(&self, name: &str) -> Result<Option<Arc<Instrument>>> {
        let snap = self.status()?;
        let inst = snap
            .get("instruments")
            .and_then(|d| d.dict_get(&name.into()))
            .and_then(FieldValue::as_tuple)
            .and_then(|t| t.get(1))
            .and_then(FieldValue::as_object)
            .and_then(|p| super::downcast(p.clone()));
        Ok(inst)
    }

    /// Remove every layer and detach every instrument.
    pub fn clear(&self) -> Result<()> {
        self.cmd("/clear", Vec::new()).map(|_| ())
    }

    /// Replace the scene's contents with a stored scene definition.
    pub fn load(&self, name: &str) -> Result<()> {
        self.cmd("/load", vec![Arg::from(name)]).map(|_| ())
    }

    /// Insert a layer at `pos` playing an instrument already attached to
    /// this scene.
    pub fn add_layer(&self, pos: i32, instrument: &str) -> Result<Arc<Layer>> {
        self.core
            .cmd_makeobj_as("/add_layer", vec![Arg::from(pos), Arg::from(instrument)])
    }

    /// Create a new instrument of the given engine type and a layer for it.
    pub fn add_instrument_layer(&self, engine: &str) -> Result<Arc<Layer>> {
        self.core
            .cmd_makeobj_as("/add_instrument_layer", vec![Arg::from(engine)])
    }

    pub fn move_layer(&self, from: i32, to: i32) -> Result<()> {
        self.cmd("/move_layer", vec![Arg::from(from), Arg::from(to)])
            .map(|_| ())
    }

    pub fn delete_layer(&self, pos: i32) -> Result<()> {
        self.cmd("/delete_layer", vec![Arg::from(pos)]).map(|_| ())
    }
}

impl Proxy for Scene {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Scene {
    const CLASS: &'static str = "scene";

    fn declare() -> StatusDecl {
        vec![
            field("name", TypeDecl::Str).writable(),
            field("title", TypeDecl::Str).writable(),
            field("transpose", TypeDecl::Int).writable(),
            field("layers", TypeDecl::list(TypeDecl::Object("layer"))),
            field(
                "instruments",
                TypeDecl::dict(TypeDecl::Str, vec![TypeDecl::Str, TypeDecl::Object("instrument")]),
            ),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}

/// One keyboard/channel split inside a scene.
#[derive(Debug)]
pub struct Layer {
    core: ProxyCore,
}

impl Layer {
    pub fn set_enable(&self, enable: bool) -> Result<()> {
        self.set("enable", FieldValue::from(enable))
    }

    pub fn set_transpose(&self, semitones: i32) -> Result<()> {
        self.set("transpose", FieldValue::from(semitones))
    }

    /// Restrict the layer to notes in `low..=high`.
    pub fn set_range(&self, low: i32, high: i32) -> Result<()> {
        self.set("low_note", FieldValue::from(low))?;
        self.set("high_note", FieldValue::from(high))
    }

    pub fn set_consume(&self, consume: bool) -> Result<()> {
        self.set("consume", FieldValue::from(consume))
    }

    pub fn instrument(&self) -> Result<Option<Arc<Instrument>>> {
        Ok(self.status()?.object("instrument"))
    }
}

impl Proxy for Layer {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Layer {
    const CLASS: &'static str = "layer";

    fn declare() -> StatusDecl {
        vec![
            field("enable", TypeDecl::Bool).writable(),
            field("transpose", TypeDecl::Int).writable(),
            field("low_note", TypeDecl::Int).writable(),
            field("high_note", TypeDecl::Int).writable(),
            field("fixed_note", TypeDecl::Int).writable(),
            field("in_channel", TypeDecl::Int).writable(),
            field("out_channel", TypeDecl::Int).writable(),
            field("consume", TypeDecl::Bool).writable(),
            field("ignore_scene_transpose", TypeDecl::Bool).writable(),
            field("instrument", TypeDecl::Object("instrument")).renamed("/instrument_uuid"),
            field("instrument_name", TypeDecl::Str),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
