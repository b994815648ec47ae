//! Error types for the client protocol layer.

use boxwire_types::{ObjectId, RemoteError};

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Malformed status description, detected while compiling a schema at
/// connection setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{class}.{field}: unknown object class '{target}'")]
    UnknownClass {
        class: String,
        field: String,
        target: String,
    },
    #[error("{class}.{field}: {reason}")]
    BadShape {
        class: String,
        field: String,
        reason: &'static str,
    },
    #[error("{class}: field '{field}' declared twice")]
    DuplicateField { class: String, field: String },
    #[error("{class}: wire key '{key}' claimed by both '{first}' and '{second}'")]
    DuplicateKey {
        class: String,
        key: String,
        first: String,
        second: String,
    },
    #[error("class '{0}' registered twice")]
    DuplicateClass(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// An argument that has no wire representation. Raised before dispatch.
    #[error("cannot encode argument {index} for {path}: {reason}")]
    Encode {
        path: String,
        index: usize,
        reason: String,
    },
    #[error("malformed command path '{0}'")]
    BadPath(String),
    /// The engine produced a value this layer cannot decode.
    #[error("cannot decode {path}: {reason}")]
    Decode { path: String, reason: String },
    /// The engine reported the command as failed.
    #[error("{0}")]
    Remote(RemoteError),
    #[error("object {id} has unknown class '{class}'")]
    UnknownClass { id: ObjectId, class: String },
    /// A value that does not fit the declared field type.
    #[error("field '{field}': {reason}")]
    Coerce { field: String, reason: String },
    #[error("{class} has no field '{field}'")]
    UnknownField { class: String, field: String },
    #[error("{class}.{field} is read-only")]
    NotWritable { class: String, field: String },
    #[error("connection closed")]
    Disconnected,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<RemoteError> for ProtocolError {
    fn from(e: RemoteError) -> Self {
        ProtocolError::Remote(e)
    }
}

impl ProtocolError {
    /// The engine's error record, if this failure came from the engine.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ProtocolError::Remote(e) => Some(e),
            _ => None,
        }
    }
}
