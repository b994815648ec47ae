//! Raw argument values as they cross the engine boundary.
//!
//! These mirror what the engine's command entry point consumes and emits:
//! one variant per wire type tag, with identities as raw bytes.

use boxwire_types::TypeTag;

/// A record the engine hands back for object-typed callback arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Embedded identity of the referenced object.
    pub uuid: [u8; 16],
    pub class_name: String,
}

/// A loosely-typed wire argument.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Str(String),
    Int(i32),
    Double(f64),
    Uuid([u8; 16]),
    Blob(Vec<u8>),
    Object(ObjectRecord),
    Nil,
}

impl WireValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            WireValue::Str(_) => TypeTag::Str,
            WireValue::Int(_) => TypeTag::Int,
            WireValue::Double(_) => TypeTag::Float,
            WireValue::Uuid(_) => TypeTag::Uuid,
            WireValue::Blob(_) => TypeTag::Blob,
            WireValue::Object(_) => TypeTag::Object,
            WireValue::Nil => TypeTag::Nil,
        }
    }
}

/// Callback message as emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub path: String,
    pub args: Vec<WireValue>,
}

impl WireEvent {
    pub fn new(path: impl Into<String>, args: Vec<WireValue>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

/// Tag string for a wire argument list.
pub fn type_tags(args: &[WireValue]) -> String {
    args.iter().map(|a| a.tag().as_char()).collect()
}
