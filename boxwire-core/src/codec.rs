//! Argument encoding and callback decoding.
//!
//! Outbound arguments are classified by shape: integral numbers become `i`,
//! floating numbers `f`, text `s`, byte buffers `b` and identities `u`.
//! Anything else has no wire form and is rejected before the command is
//! dispatched.

use boxwire_types::{path, CallbackEvent, Command, ObjectId, Value};

use crate::error::{ProtocolError, Result};
use crate::wire::{WireEvent, WireValue};

/// An outbound argument prior to encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Str(String),
    Blob(Vec<u8>),
    Uuid(ObjectId),
    /// A value with no wire representation; names what it was.
    Unsupported(&'static str),
}

impl Arg {
    fn into_value(self) -> std::result::Result<Value, String> {
        match self {
            Arg::Int(v) => i32::try_from(v)
                .map(Value::Int)
                .map_err(|_| format!("integer {} does not fit in int32", v)),
            Arg::Float(v) => Ok(Value::Float(v)),
            Arg::Str(s) => Ok(Value::Str(s)),
            Arg::Blob(b) => Ok(Value::Blob(b)),
            Arg::Uuid(id) => Ok(Value::Uuid(id)),
            Arg::Unsupported(what) => Err(format!("{} has no wire type", what)),
        }
    }
}

macro_rules! arg_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Self {
                Arg::Int(v as i64)
            }
        })*
    };
}

arg_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        i64::try_from(v).map(Arg::Int).unwrap_or(Arg::Unsupported("oversized usize"))
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Int(i64::from(v))
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(f64::from(v))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

impl From<&String> for Arg {
    fn from(v: &String) -> Self {
        Arg::Str(v.clone())
    }
}

impl From<Vec<u8>> for Arg {
    fn from(v: Vec<u8>) -> Self {
        Arg::Blob(v)
    }
}

impl From<&[u8]> for Arg {
    fn from(v: &[u8]) -> Self {
        Arg::Blob(v.to_vec())
    }
}

impl From<ObjectId> for Arg {
    fn from(v: ObjectId) -> Self {
        Arg::Uuid(v)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        match v {
            Value::Int(i) => Arg::Int(i64::from(i)),
            Value::Float(f) => Arg::Float(f),
            Value::Str(s) => Arg::Str(s),
            Value::Blob(b) => Arg::Blob(b),
            Value::Uuid(id) => Arg::Uuid(id),
        }
    }
}

impl From<&serde_json::Value> for Arg {
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Bool(b) => Arg::from(*b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Arg::Int(i),
                None => n
                    .as_f64()
                    .map(Arg::Float)
                    .unwrap_or(Arg::Unsupported("JSON number")),
            },
            J::String(s) => Arg::Str(s.clone()),
            J::Null => Arg::Unsupported("null"),
            J::Array(_) => Arg::Unsupported("JSON array"),
            J::Object(_) => Arg::Unsupported("JSON object"),
        }
    }
}

/// Build a command from loosely-typed arguments, rejecting any argument
/// without a wire form.
pub fn encode_command(path: &str, args: Vec<Arg>) -> Result<Command> {
    if !path::is_valid(path) {
        return Err(ProtocolError::BadPath(path.to_string()));
    }
    let values = args
        .into_iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.into_value().map_err(|reason| ProtocolError::Encode {
                path: path.to_string(),
                index,
                reason,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Command::new(path, values))
}

pub fn to_wire(value: &Value) -> WireValue {
    match value {
        Value::Int(v) => WireValue::Int(*v),
        Value::Float(v) => WireValue::Double(*v),
        Value::Str(s) => WireValue::Str(s.clone()),
        Value::Blob(b) => WireValue::Blob(b.clone()),
        Value::Uuid(id) => WireValue::Uuid(*id.as_bytes()),
    }
}

/// Decode one callback argument. The `N` sentinel is a protocol violation.
pub fn from_wire(value: &WireValue) -> std::result::Result<Value, String> {
    match value {
        WireValue::Str(s) => Ok(Value::Str(s.clone())),
        WireValue::Int(v) => Ok(Value::Int(*v)),
        WireValue::Double(v) => Ok(Value::Float(*v)),
        WireValue::Uuid(bytes) => Ok(Value::Uuid(ObjectId::from_bytes(*bytes))),
        WireValue::Blob(b) => Ok(Value::Blob(b.clone())),
        WireValue::Object(rec) => Ok(Value::Uuid(ObjectId::from_bytes(rec.uuid))),
        WireValue::Nil => Err("absent-value sentinel in callback".to_string()),
    }
}

pub fn decode_event(event: &WireEvent) -> Result<CallbackEvent> {
    let args = event
        .args
        .iter()
        .map(from_wire)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|reason| ProtocolError::Decode {
            path: event.path.clone(),
            reason,
        })?;
    Ok(CallbackEvent::new(event.path.clone(), args))
}
