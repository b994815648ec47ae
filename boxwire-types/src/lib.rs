//! # boxwire-types
//!
//! Shared type definitions for the boxwire engine-control protocol.
//! This crate contains the data model used by boxwire-core, boxwire-sim and
//! the probe binary: object identities, typed values, commands, callback
//! events and the binary pattern-event format.

mod id;
pub mod message;
pub mod path;
pub mod pattern;
mod value;

pub use id::{ObjectId, ParseIdError};
pub use message::{CallbackEvent, Command, RemoteError};
pub use pattern::{decode_events, encode_events, PatternError, PatternEvent, RECORD_SIZE};
pub use value::{TypeTag, Value};
