use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a remote object.
///
/// Displayed in the 32-character lowercase hex form the engine uses inside
/// identity-addressed paths. Parsing also accepts the hyphenated form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id '{0}'")]
pub struct ParseIdError(pub String);

impl ObjectId {
    pub const NIL: ObjectId = ObjectId(Uuid::nil());

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The all-zero identity, which the engine uses for "no object".
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn parse(s: &str) -> Result<Self, ParseIdError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ObjectId {
    fn from(u: Uuid) -> Self {
        Self(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_32_hex_chars() {
        let id = ObjectId::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let s = id.to_string();
        assert_eq!(s.len(), 32);
        assert_eq!(s, "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_parses_hyphenated_and_simple() {
        let a = ObjectId::parse("0123456789abcdef0123456789abcdef").unwrap();
        let b = ObjectId::parse("01234567-89ab-cdef-0123-456789abcdef").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ObjectId::parse("not-a-uuid").is_err());
        assert!("".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_nil_detection() {
        assert!(ObjectId::NIL.is_nil());
        assert!(ObjectId::from_bytes([0; 16]).is_nil());
        assert!(!ObjectId::from_u128(1).is_nil());
    }
}
