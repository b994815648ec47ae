use boxwire_types::{CallbackEvent, Value};

use crate::codec::Arg;
use crate::error::Result;
use crate::schema::StatusDecl;

use super::{Proxy, ProxyClass, ProxyCore};

/// The engine's own key/value configuration store, bound to `/config`.
///
/// Keys live in named sections. The store is the only persistence this layer
/// touches; `save` asks the engine to write it out.
#[derive(Debug)]
pub struct EngineConfig {
    core: ProxyCore,
}

fn strings(events: &[CallbackEvent], key: &str) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.key() == key)
        .filter_map(|e| e.args.first().and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

impl EngineConfig {
    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        let events = self.cmd("/get", vec![Arg::from(section), Arg::from(key)])?;
        Ok(strings(&events, "value").into_iter().next())
    }

    pub fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        self.cmd(
            "/set",
            vec![Arg::from(section), Arg::from(key), Arg::from(value)],
        )
        .map(|_| ())
    }

    pub fn delete(&self, section: &str, key: &str) -> Result<()> {
        self.cmd("/delete", vec![Arg::from(section), Arg::from(key)])
            .map(|_| ())
    }

    pub fn keys(&self, section: &str) -> Result<Vec<String>> {
        let events = self.cmd("/keys", vec![Arg::from(section)])?;
        Ok(strings(&events, "key"))
    }

    /// Section names starting with `prefix` (empty for all).
    pub fn sections(&self, prefix: &str) -> Result<Vec<String>> {
        let events = self.cmd("/sections", vec![Arg::from(prefix)])?;
        Ok(strings(&events, "section"))
    }

    pub fn save(&self) -> Result<()> {
        self.cmd("/save", Vec::new()).map(|_| ())
    }
}

impl Proxy for EngineConfig {
    fn core(&self) -> &ProxyCore {
        &self.core
    }
}

impl ProxyClass for EngineConfig {
    const CLASS: &'static str = "config";

    fn declare() -> StatusDecl {
        Vec::new()
    }

    fn from_core(core: ProxyCore) -> Self {
        Self { core }
    }
}
