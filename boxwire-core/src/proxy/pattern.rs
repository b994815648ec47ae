use boxwire_types::{decode_events, PatternEvent, Value};

use crate::error::{ProtocolError, Result};
use crate::schema::{field, StatusDecl, TypeDecl};
use crate::snapshot::FieldValue;

use super::{Proxy, ProxyClass, ProxyCore};

/// A looped sequence of timed events.
#[derive(Debug)]
pub struct Pattern {
    core: ProxyCore,
}

impl Pattern {
    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set("name", FieldValue::from(name))
    }

    /// Fetch the pattern's event blob and decode it.
    pub fn events(&self) -> Result<Vec<PatternEvent>> {
        let events = self.cmd("/blob", Vec::new())?;
        let path = boxwire_types::path::join(self.core.base_path(), "/blob");
        let blob = events
            .iter()
            .find(|e| e.key() == "blob")
            .and_then(|e| e.args.first())
            .and_then(Value::as_blob)
            .ok_or_else(|| ProtocolError::Decode {
                path: path.clone(),
                reason: "no /blob in reply".to_string(),
            })?;
        decode_events(blob).map_err(|e| ProtocolError::Decode {
            path,
            reason: e.to_string(),
        })
    }
}

impl Proxy for Pattern {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for Pattern {
    const CLASS: &'static str = "pattern";

    fn declare() -> StatusDecl {
        vec![
            field("name", TypeDecl::Str).writable(),
            field("length", TypeDecl::Int),
            field("event_count", TypeDecl::Int),
        ]
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
