//! OSC frame bridge.
//!
//! Some engines expose their command entry point as a function taking one
//! encoded OSC frame and returning another. [`OscBridge`] adapts such a
//! handler to [`EngineBackend`]; [`serve_frame`] is the matching server side,
//! wrapping any backend behind a frame handler.
//!
//! Framing:
//! - request: one message at the command path; the first argument is the
//!   boxwire type-tag string, followed by one OSC argument per value
//!   (identities travel as 16-byte blobs)
//! - success: a bundle holding one message per callback event, framed the
//!   same way
//! - failure: a single `/error` message carrying `s i s` (domain, code,
//!   message)

use boxwire_types::{RemoteError, TypeTag};
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::backend::{BackendResult, EngineBackend};
use crate::wire::{type_tags, ObjectRecord, WireEvent, WireValue};

const ERROR_ADDR: &str = "/error";
const BRIDGE_DOMAIN: &str = "osc";

/// Engine entry point consuming and producing encoded OSC frames.
pub trait FrameHandler: Send + Sync {
    fn handle(&self, frame: &[u8]) -> Result<Vec<u8>, String>;
}

impl<F> FrameHandler for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync,
{
    fn handle(&self, frame: &[u8]) -> Result<Vec<u8>, String> {
        self(frame)
    }
}

/// Backend speaking to a frame handler.
pub struct OscBridge<H> {
    handler: H,
}

impl<H: FrameHandler> OscBridge<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

fn bridge_error(code: i32, message: impl Into<String>) -> RemoteError {
    RemoteError::new(BRIDGE_DOMAIN, code, message)
}

impl<H: FrameHandler> EngineBackend for OscBridge<H> {
    fn execute(&self, path: &str, type_tags: &str, args: &[WireValue]) -> BackendResult {
        let request = encode_message(path, type_tags, args);
        let frame = rosc::encoder::encode(&OscPacket::Message(request))
            .map_err(|e| bridge_error(1, format!("encode {}: {}", path, e)))?;
        let reply = self
            .handler
            .handle(&frame)
            .map_err(|e| bridge_error(2, format!("handler failed for {}: {}", path, e)))?;
        let (_, packet) = rosc::decoder::decode_udp(&reply)
            .map_err(|e| bridge_error(3, format!("decode reply to {}: {:?}", path, e)))?;

        match packet {
            OscPacket::Message(m) if m.addr == ERROR_ADDR => Err(decode_error(&m)),
            OscPacket::Message(m) => Ok(vec![decode_message(&m)?]),
            OscPacket::Bundle(b) => {
                let mut events = Vec::with_capacity(b.content.len());
                flatten(&b, &mut events)?;
                Ok(events)
            }
        }
    }
}

fn flatten(bundle: &OscBundle, out: &mut Vec<WireEvent>) -> Result<(), RemoteError> {
    for packet in &bundle.content {
        match packet {
            OscPacket::Message(m) => out.push(decode_message(m)?),
            OscPacket::Bundle(inner) => flatten(inner, out)?,
        }
    }
    Ok(())
}

/// Serve one request frame from `backend`, producing the reply frame.
pub fn serve_frame(backend: &dyn EngineBackend, frame: &[u8]) -> Result<Vec<u8>, String> {
    let (_, packet) = rosc::decoder::decode_udp(frame).map_err(|e| format!("{:?}", e))?;
    let OscPacket::Message(request) = packet else {
        return Err("request must be a single message".to_string());
    };

    let reply = match decode_message(&request) {
        Err(e) => error_message(&e),
        Ok(cmd) => {
            let tags = type_tags(&cmd.args);
            match backend.execute(&cmd.path, &tags, &cmd.args) {
                Ok(events) => OscPacket::Bundle(OscBundle {
                    timetag: OscTime {
                        seconds: 0,
                        fractional: 1,
                    },
                    content: events
                        .iter()
                        .map(|ev| OscPacket::Message(encode_message(&ev.path, &type_tags(&ev.args), &ev.args)))
                        .collect(),
                }),
                Err(e) => error_message(&e),
            }
        }
    };
    rosc::encoder::encode(&reply).map_err(|e| e.to_string())
}

fn error_message(e: &RemoteError) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: ERROR_ADDR.to_string(),
        args: vec![
            OscType::String(e.domain.clone()),
            OscType::Int(e.code),
            OscType::String(e.message.clone()),
        ],
    })
}

fn decode_error(m: &OscMessage) -> RemoteError {
    match m.args.as_slice() {
        [OscType::String(domain), OscType::Int(code), OscType::String(message)] => {
            RemoteError::new(domain.clone(), *code, message.clone())
        }
        _ => bridge_error(4, "malformed /error reply"),
    }
}

fn encode_message(path: &str, tags: &str, args: &[WireValue]) -> OscMessage {
    let mut osc_args = Vec::with_capacity(args.len() + 1);
    osc_args.push(OscType::String(tags.to_string()));
    osc_args.extend(args.iter().map(to_osc));
    OscMessage {
        addr: path.to_string(),
        args: osc_args,
    }
}

fn to_osc(v: &WireValue) -> OscType {
    match v {
        WireValue::Str(s) => OscType::String(s.clone()),
        WireValue::Int(i) => OscType::Int(*i),
        WireValue::Double(f) => OscType::Double(*f),
        WireValue::Uuid(bytes) => OscType::Blob(bytes.to_vec()),
        WireValue::Blob(b) => OscType::Blob(b.clone()),
        WireValue::Object(rec) => OscType::Blob(rec.uuid.to_vec()),
        WireValue::Nil => OscType::Nil,
    }
}

fn decode_message(m: &OscMessage) -> Result<WireEvent, RemoteError> {
    let malformed = |reason: String| bridge_error(5, format!("{}: {}", m.addr, reason));
    let Some((OscType::String(tags), rest)) = m.args.split_first() else {
        return Err(malformed("missing type-tag string".to_string()));
    };
    if tags.chars().count() != rest.len() {
        return Err(malformed(format!(
            "tag string '{}' does not match {} arguments",
            tags,
            rest.len()
        )));
    }
    let args = tags
        .chars()
        .zip(rest)
        .map(|(c, a)| from_osc(c, a).ok_or_else(|| malformed(format!("bad '{}' argument {:?}", c, a))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WireEvent::new(m.addr.clone(), args))
}

fn from_osc(tag: char, a: &OscType) -> Option<WireValue> {
    Some(match (TypeTag::from_char(tag)?, a) {
        (TypeTag::Str, OscType::String(s)) => WireValue::Str(s.clone()),
        (TypeTag::Int, OscType::Int(i)) => WireValue::Int(*i),
        (TypeTag::Float, OscType::Double(f)) => WireValue::Double(*f),
        (TypeTag::Float, OscType::Float(f)) => WireValue::Double(f64::from(*f)),
        (TypeTag::Blob, OscType::Blob(b)) => WireValue::Blob(b.clone()),
        (TypeTag::Uuid, OscType::Blob(b)) => WireValue::Uuid(b.as_slice().try_into().ok()?),
        (TypeTag::Object, OscType::Blob(b)) => WireValue::Object(ObjectRecord {
            uuid: b.as_slice().try_into().ok()?,
            class_name: String::new(),
        }),
        (TypeTag::Nil, OscType::Nil) => WireValue::Nil,
        _ => return None,
    })
}
