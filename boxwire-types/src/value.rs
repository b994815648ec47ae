use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ObjectId;

/// Single-character wire type tag. Tag order in a tag string matches
/// argument order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Str,
    Int,
    Float,
    Uuid,
    Blob,
    Object,
    /// Absent-value sentinel; never valid in a successful call.
    Nil,
}

impl TypeTag {
    pub fn as_char(self) -> char {
        match self {
            TypeTag::Str => 's',
            TypeTag::Int => 'i',
            TypeTag::Float => 'f',
            TypeTag::Uuid => 'u',
            TypeTag::Blob => 'b',
            TypeTag::Object => 'o',
            TypeTag::Nil => 'N',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(TypeTag::Str),
            'i' => Some(TypeTag::Int),
            'f' => Some(TypeTag::Float),
            'u' => Some(TypeTag::Uuid),
            'b' => Some(TypeTag::Blob),
            'o' => Some(TypeTag::Object),
            'N' => Some(TypeTag::Nil),
            _ => None,
        }
    }
}

/// A decoded argument value.
///
/// Object references arrive on the wire as records carrying an embedded
/// identity; they decode to `Value::Uuid` of that identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i32),
    Float(f64),
    Str(String),
    Blob(Vec<u8>),
    Uuid(ObjectId),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::Blob(_) => TypeTag::Blob,
            Value::Uuid(_) => TypeTag::Uuid,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; ints widen to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Identity view. Strings holding a canonical id are accepted too, since
    /// some transports carry identities as hex text.
    pub fn as_uuid(&self) -> Option<ObjectId> {
        match self {
            Value::Uuid(id) => Some(*id),
            Value::Str(s) => ObjectId::parse(s).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::Uuid(id) => write!(f, "{}", id),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::Uuid(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_chars_round_trip() {
        for tag in [
            TypeTag::Str,
            TypeTag::Int,
            TypeTag::Float,
            TypeTag::Uuid,
            TypeTag::Blob,
            TypeTag::Object,
            TypeTag::Nil,
        ] {
            assert_eq!(TypeTag::from_char(tag.as_char()), Some(tag));
        }
        assert_eq!(TypeTag::from_char('x'), None);
    }

    #[test]
    fn test_uuid_view_accepts_hex_strings() {
        let id = ObjectId::from_u128(42);
        assert_eq!(Value::Str(id.to_string()).as_uuid(), Some(id));
        assert_eq!(Value::Str("nope".into()).as_uuid(), None);
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
    }
}
