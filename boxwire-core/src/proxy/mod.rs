//! Client-side handles for remote objects.
//!
//! A proxy is either identity-bound (resolved through the registry and
//! cached under its id) or path-bound (constructed on demand for a fixed
//! path such as `/master`). Both expose `status()`, a generic `cmd()`, and
//! the setters their schema generated.

mod config_store;
mod engine;
mod instrument;
mod master;
mod pattern;
mod scene;
mod song;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use boxwire_types::{path, CallbackEvent, ObjectId, Value};

pub use config_store::EngineConfig;
pub use engine::Engine;
pub use instrument::{Instrument, SoundEngine};
pub use master::Master;
pub use pattern::Pattern;
pub use scene::{Layer, Scene};
pub use song::{Song, Track};

use crate::codec::Arg;
use crate::connection::Connection;
use crate::error::{ProtocolError, Result};
use crate::schema::{Coerce, Schema, Slot, StatusDecl};
use crate::snapshot::{FieldValue, Snapshot};

pub type ProxyRef = Arc<dyn Proxy>;

/// Type-erasure helper so `Arc<dyn Proxy>` can be downcast.
pub trait AsAny {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Downcast a type-erased proxy to a concrete proxy type.
pub fn downcast<T: Proxy>(p: ProxyRef) -> Option<Arc<T>> {
    p.into_any().downcast::<T>().ok()
}

/// Where a proxy's commands are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Path(String),
    Identity(ObjectId),
}

/// State shared by every proxy: connection, address and compiled schema.
pub struct ProxyCore {
    conn: Weak<Connection>,
    address: Address,
    base: String,
    class: &'static str,
    schema: Arc<Schema>,
}

impl fmt::Debug for ProxyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.class, self.base)
    }
}

impl ProxyCore {
    pub(crate) fn new(
        conn: Weak<Connection>,
        address: Address,
        base: String,
        class: &'static str,
        schema: Arc<Schema>,
    ) -> Self {
        Self {
            conn,
            address,
            base,
            class,
            schema,
        }
    }

    pub fn connection(&self) -> Result<Arc<Connection>> {
        self.conn.upgrade().ok_or(ProtocolError::Disconnected)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Absolute path every relative command is appended to.
    pub fn base_path(&self) -> &str {
        &self.base
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn id(&self) -> Option<ObjectId> {
        match self.address {
            Address::Identity(id) => Some(id),
            Address::Path(_) => None,
        }
    }

    /// Identity of an identity-bound proxy; path-bound proxies cannot be
    /// passed as object arguments.
    pub fn require_id(&self) -> Result<ObjectId> {
        self.id().ok_or_else(|| ProtocolError::Coerce {
            field: self.base.clone(),
            reason: "path-bound object has no identity".to_string(),
        })
    }

    pub fn cmd(&self, rel: &str, args: Vec<Arg>) -> Result<Vec<CallbackEvent>> {
        self.connection()?.cmd(&path::join(&self.base, rel), args)
    }

    /// Run a command that creates a remote object and resolve the identity
    /// it reports through the registry.
    pub fn cmd_makeobj(&self, rel: &str, args: Vec<Arg>) -> Result<ProxyRef> {
        let conn = self.connection()?;
        let full = path::join(&self.base, rel);
        let events = conn.cmd(&full, args)?;
        let id = find_uuid(&events).ok_or_else(|| ProtocolError::Decode {
            path: full,
            reason: "no /uuid in reply".to_string(),
        })?;
        conn.resolve(id)
    }

    /// Like `cmd_makeobj`, downcast to the expected proxy type.
    pub fn cmd_makeobj_as<T: Proxy>(&self, rel: &str, args: Vec<Arg>) -> Result<Arc<T>> {
        let proxy = self.cmd_makeobj(rel, args)?;
        expect_class(proxy)
    }

    pub fn status(&self) -> Result<Snapshot> {
        self.connection()?.status(&self.base, &self.schema)
    }

    /// Generated setter for a writable scalar field.
    pub fn set(&self, field: &str, value: FieldValue) -> Result<()> {
        let f = self
            .schema
            .field(field)
            .ok_or_else(|| ProtocolError::UnknownField {
                class: self.class.to_string(),
                field: field.to_string(),
            })?;
        let (Some(setter), Slot::Scalar(c)) = (&f.setter, &f.slot) else {
            return Err(ProtocolError::NotWritable {
                class: self.class.to_string(),
                field: field.to_string(),
            });
        };
        let args = encode_field(field, c, value)?;
        self.cmd(setter, args).map(|_| ())
    }
}

/// Identity reported by a `/uuid` callback.
pub(crate) fn find_uuid(events: &[CallbackEvent]) -> Option<ObjectId> {
    events
        .iter()
        .find(|e| e.key() == "uuid")
        .and_then(|e| e.args.first())
        .and_then(Value::as_uuid)
}

pub(crate) fn expect_class<T: Proxy>(proxy: ProxyRef) -> Result<Arc<T>> {
    let class = proxy.core().class();
    let id = proxy.id().unwrap_or(ObjectId::NIL);
    downcast::<T>(proxy).ok_or_else(|| ProtocolError::UnknownClass {
        id,
        class: format!("{} (not the requested proxy type)", class),
    })
}

/// Coerce a setter value into wire arguments.
fn encode_field(field: &str, c: &Coerce, value: FieldValue) -> Result<Vec<Arg>> {
    let err = |reason: String| ProtocolError::Coerce {
        field: field.to_string(),
        reason,
    };
    match (c, value) {
        (Coerce::Tuple(items), FieldValue::Tuple(values)) => {
            if items.len() != values.len() {
                return Err(err(format!(
                    "expected {} values, got {}",
                    items.len(),
                    values.len()
                )));
            }
            items
                .iter()
                .zip(values)
                .map(|(c, v)| encode_one(c, v).map_err(&err))
                .collect()
        }
        (Coerce::Tuple(_), other) => Err(err(format!("expected a tuple, got {:?}", other))),
        (c, v) => encode_one(c, v).map(|a| vec![a]).map_err(err),
    }
}

fn encode_one(c: &Coerce, v: FieldValue) -> std::result::Result<Arg, String> {
    match (c, v) {
        (Coerce::Bool, FieldValue::Bool(b)) => Ok(Arg::from(b)),
        (Coerce::Bool, FieldValue::Value(Value::Int(i))) => Ok(Arg::from(i != 0)),
        (Coerce::Object(_), FieldValue::Object(p)) => p
            .id()
            .map(Arg::Uuid)
            .ok_or_else(|| "path-bound object has no identity".to_string()),
        (Coerce::Object(_) | Coerce::Uuid, FieldValue::None) => Ok(Arg::Uuid(ObjectId::NIL)),
        (Coerce::Float, FieldValue::Value(Value::Int(i))) => Ok(Arg::Float(f64::from(i))),
        (Coerce::Any, FieldValue::Value(v)) => Ok(Arg::from(v)),
        (c, FieldValue::Value(v)) if matches_tag(c, &v) => Ok(Arg::from(v)),
        (c, other) => Err(format!("{:?} does not fit {:?}", other, c)),
    }
}

fn matches_tag(c: &Coerce, v: &Value) -> bool {
    matches!(
        (c, v),
        (Coerce::Int, Value::Int(_))
            | (Coerce::Float, Value::Float(_))
            | (Coerce::Str, Value::Str(_))
            | (Coerce::Blob, Value::Blob(_))
            | (Coerce::Uuid | Coerce::Object(_), Value::Uuid(_))
    )
}

/// A client handle for a remote object.
pub trait Proxy: AsAny + fmt::Debug + Send + Sync + 'static {
    fn core(&self) -> &ProxyCore;

    /// Runs once, right after the proxy is first cached.
    fn after_resolve(&self) -> Result<()> {
        Ok(())
    }

    fn id(&self) -> Option<ObjectId> {
        self.core().id()
    }

    fn status(&self) -> Result<Snapshot> {
        self.core().status()
    }

    fn cmd(&self, rel: &str, args: Vec<Arg>) -> Result<Vec<CallbackEvent>> {
        self.core().cmd(rel, args)
    }

    fn set(&self, field: &str, value: FieldValue) -> Result<()> {
        self.core().set(field, value)
    }
}

/// A proxy type that can be registered with a connection's class map.
pub trait ProxyClass: Proxy + Sized + 'static {
    /// Remote class name this proxy stands in for.
    const CLASS: &'static str;

    fn declare() -> StatusDecl;

    fn from_core(core: ProxyCore) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_bool_as_int() {
        assert_eq!(
            encode_field("enable", &Coerce::Bool, FieldValue::Bool(true)).unwrap(),
            vec![Arg::Int(1)]
        );
        assert_eq!(
            encode_field("enable", &Coerce::Bool, FieldValue::Bool(false)).unwrap(),
            vec![Arg::Int(0)]
        );
    }

    #[test]
    fn test_encodes_tuples_positionally() {
        let c = Coerce::Tuple(vec![Coerce::Int, Coerce::Int]);
        assert_eq!(
            encode_field("timesig", &c, FieldValue::from((3, 4))).unwrap(),
            vec![Arg::Int(3), Arg::Int(4)]
        );
        assert!(encode_field("timesig", &c, FieldValue::from(3)).is_err());
        assert!(encode_field("timesig", &c, FieldValue::from((1, 2, 3))).is_err());
    }

    #[test]
    fn test_widens_int_for_float_fields() {
        assert_eq!(
            encode_field("tempo", &Coerce::Float, FieldValue::from(120)).unwrap(),
            vec![Arg::Float(120.0)]
        );
    }

    #[test]
    fn test_rejects_mismatched_value() {
        assert!(matches!(
            encode_field("name", &Coerce::Str, FieldValue::from(5)),
            Err(ProtocolError::Coerce { .. })
        ));
    }

    #[test]
    fn test_finds_uuid_event() {
        let id = ObjectId::from_u128(3);
        let events = vec![
            CallbackEvent::new("/other", vec![Value::Int(1)]),
            CallbackEvent::new("/uuid", vec![Value::Uuid(id)]),
        ];
        assert_eq!(find_uuid(&events), Some(id));
        assert_eq!(find_uuid(&events[..1]), None);
    }
}
