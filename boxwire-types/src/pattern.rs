//! Binary pattern-event records exchanged with the remote sequencer.
//!
//! Each event is an 8-byte little-endian record:
//!
//! ```text
//! [0..4]  tick offset (u32 LE)
//! [4]     payload length (2 or 3)
//! [5..8]  payload: status, data1, data2 (unused trailing bytes are zero)
//! ```
//!
//! A pattern blob is a plain concatenation of records.

use serde::{Deserialize, Serialize};

/// Size of one encoded event record in bytes.
pub const RECORD_SIZE: usize = 8;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern blob length {0} is not a multiple of {RECORD_SIZE}")]
    TrailingBytes(usize),
    #[error("event {index}: payload length {len} (expected 2 or 3)")]
    BadLength { index: usize, len: u8 },
}

/// One timed MIDI-style event in a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub tick: u32,
    len: u8,
    payload: [u8; 3],
}

impl PatternEvent {
    /// Three-byte event (note, controller and similar messages). Data bytes
    /// are masked to 7 bits, so out-of-range values wrap rather than
    /// corrupt the status byte of the next message.
    pub fn new(tick: u32, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            tick,
            len: 3,
            payload: [status, data1 & 0x7f, data2 & 0x7f],
        }
    }

    /// Two-byte event (program change, channel pressure). The data byte is
    /// masked to 7 bits.
    pub fn short(tick: u32, status: u8, data1: u8) -> Self {
        Self {
            tick,
            len: 2,
            payload: [status, data1 & 0x7f, 0],
        }
    }

    pub fn note_on(tick: u32, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self::new(tick, NOTE_ON | (channel & 0x0f), pitch, velocity)
    }

    pub fn note_off(tick: u32, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self::new(tick, NOTE_OFF | (channel & 0x0f), pitch, velocity)
    }

    pub fn control_change(tick: u32, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(tick, CONTROL_CHANGE | (channel & 0x0f), controller, value)
    }

    pub fn program_change(tick: u32, channel: u8, program: u8) -> Self {
        Self::short(tick, PROGRAM_CHANGE | (channel & 0x0f), program)
    }

    /// Number of payload bytes, 2 or 3.
    pub fn payload_len(&self) -> u8 {
        self.len
    }

    pub fn status(&self) -> u8 {
        self.payload[0]
    }

    pub fn data1(&self) -> u8 {
        self.payload[1]
    }

    pub fn data2(&self) -> Option<u8> {
        (self.len == 3).then_some(self.payload[2])
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&self.tick.to_le_bytes());
        out[4] = self.len;
        out[5..8].copy_from_slice(&self.payload);
        out
    }
}

/// Concatenate events into a pattern blob.
pub fn encode_events(events: &[PatternEvent]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(events.len() * RECORD_SIZE);
    for ev in events {
        blob.extend_from_slice(&ev.to_bytes());
    }
    blob
}

/// Parse a pattern blob back into events.
pub fn decode_events(blob: &[u8]) -> Result<Vec<PatternEvent>, PatternError> {
    if blob.len() % RECORD_SIZE != 0 {
        return Err(PatternError::TrailingBytes(blob.len()));
    }
    blob.chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(index, rec)| {
            let tick = u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]);
            let len = rec[4];
            if len != 2 && len != 3 {
                return Err(PatternError::BadLength { index, len });
            }
            let mut payload = [rec[5], rec[6], rec[7]];
            if len == 2 {
                payload[2] = 0;
            }
            Ok(PatternEvent { tick, len, payload })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_record_layout() {
        let ev = PatternEvent::note_on(10, 0, 36, 100);
        assert_eq!(ev.to_bytes(), [10, 0, 0, 0, 3, 0x90, 36, 100]);
    }

    #[test]
    fn test_program_change_is_two_bytes() {
        let ev = PatternEvent::program_change(0, 2, 5);
        assert_eq!(ev.payload_len(), 2);
        assert_eq!(ev.data2(), None);
        assert_eq!(ev.to_bytes(), [0, 0, 0, 0, 2, 0xC2, 5, 0]);
    }

    #[test]
    fn test_blob_concatenates_records() {
        let events = vec![
            PatternEvent::note_on(0, 0, 36, 100),
            PatternEvent::note_off(10, 0, 36, 100),
        ];
        let blob = encode_events(&events);
        assert_eq!(blob.len(), 16);
        assert_eq!(decode_events(&blob).unwrap(), events);
    }

    #[test]
    fn test_rejects_partial_record() {
        let blob = vec![0u8; 12];
        assert_eq!(decode_events(&blob), Err(PatternError::TrailingBytes(12)));
    }

    #[test]
    fn test_rejects_bad_payload_length() {
        let mut blob = encode_events(&[PatternEvent::note_on(0, 0, 60, 1)]);
        blob[4] = 1;
        assert_eq!(
            decode_events(&blob),
            Err(PatternError::BadLength { index: 0, len: 1 })
        );
    }

    #[test]
    fn test_data_bytes_are_masked_to_seven_bits() {
        let ev = PatternEvent::note_on(0, 0, 200, 255);
        assert_eq!(ev.data1(), 72);
        assert_eq!(ev.data2(), Some(127));
        assert_eq!(ev.status(), 0x90);

        let ev = PatternEvent::program_change(0, 0, 130);
        assert_eq!(ev.data1(), 2);
    }

    #[test]
    fn test_large_tick_is_little_endian() {
        let ev = PatternEvent::note_on(0x0102_0304, 0, 60, 1);
        assert_eq!(&ev.to_bytes()[0..4], &[4, 3, 2, 1]);
    }
}
