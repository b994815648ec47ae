//! # boxwire-core
//!
//! Client-side protocol layer for a path-addressed audio engine.
//!
//! A [`Connection`] wraps one [`EngineBackend`] and provides:
//! - argument encoding and callback decoding ([`codec`])
//! - synchronous command invocation returning ordered callback events
//! - schema-driven aggregation of status replies into [`Snapshot`]s
//! - an identity cache resolving remote objects to typed proxies
//!
//! Proxy types declare their status fields once as a [`schema::StatusDecl`];
//! the declarations compile when the connection opens.

pub mod aggregate;
pub mod backend;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod osc;
pub mod proxy;
pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod wire;

pub use aggregate::{aggregate, ObjectResolver, Unmatched};
pub use backend::{BackendResult, EngineBackend, RecordedCommand, TestBackend};
pub use codec::Arg;
pub use config::Config;
pub use connection::Connection;
pub use error::{ProtocolError, Result, SchemaError};
pub use osc::{serve_frame, FrameHandler, OscBridge};
pub use proxy::{
    downcast, Engine, EngineConfig, Instrument, Layer, Master, Pattern, Proxy, ProxyClass, ProxyRef,
    Scene, Song, SoundEngine, Track,
};
pub use registry::ClassMapBuilder;
pub use snapshot::{FieldValue, Snapshot};
pub use wire::{ObjectRecord, WireEvent, WireValue};

pub use boxwire_types as types;
