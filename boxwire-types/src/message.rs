//! Request and response records crossing the engine boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// One outbound path-addressed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub path: String,
    pub args: Vec<Value>,
}

impl Command {
    pub fn new(path: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// Tag string for the argument list, e.g. `"sii"`.
    pub fn type_tags(&self) -> String {
        self.args.iter().map(|a| a.tag().as_char()).collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ,{}", self.path, self.type_tags())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One message emitted by the engine while a command executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    /// Path suffix relative to the command's target, e.g. `"/name"`.
    pub path: String,
    pub args: Vec<Value>,
}

impl CallbackEvent {
    pub fn new(path: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// The suffix with its leading separator removed.
    pub fn key(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

/// Out-of-band failure record returned by the engine. Displays as the
/// engine's message, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub domain: String,
    pub code: i32,
    pub message: String,
}

impl RemoteError {
    pub fn new(domain: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectId;

    #[test]
    fn test_type_tags_follow_argument_order() {
        let cmd = Command::new(
            "/add_layer",
            vec![
                Value::Str("piano".into()),
                Value::Int(1),
                Value::Float(0.5),
                Value::Uuid(ObjectId::from_u128(7)),
                Value::Blob(vec![1, 2]),
            ],
        );
        assert_eq!(cmd.type_tags(), "sifub");
    }

    #[test]
    fn test_event_key_strips_one_separator() {
        assert_eq!(CallbackEvent::new("/name", vec![]).key(), "name");
        assert_eq!(CallbackEvent::new("name", vec![]).key(), "name");
    }

    #[test]
    fn test_remote_error_displays_message_verbatim() {
        let err = RemoteError::new("scene", 3, "Instrument 'x' already attached");
        assert_eq!(err.to_string(), "Instrument 'x' already attached");
    }
}
