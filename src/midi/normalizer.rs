// Event normalizer - raw device input to canonical note events

use crate::midi::event::MidiEvent;
use serde::{Deserialize, Serialize};

/// Default octave correction for external MIDI devices
pub const DEFAULT_EXTERNAL_PITCH_OFFSET: i32 = -12;

/// Input as delivered by a device collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    /// Bytes from an external MIDI device, stamped on arrival (session clock, ms)
    Midi { bytes: Vec<u8>, timestamp_ms: f64 },
    /// On-screen or computer keyboard; already in notation pitch space
    Key {
        pitch: i32,
        is_note_on: bool,
        velocity: u8,
        timestamp_ms: f64,
    },
}

/// Canonical note event, latency-corrected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub pitch: i32,
    pub is_note_on: bool,
    pub velocity: u8,
    pub timestamp_ms: f64,
    pub source_is_external: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventNormalizer {
    external_pitch_offset: i32,
    latency_compensation_ms: i32,
}

impl EventNormalizer {
    pub fn new(external_pitch_offset: i32, latency_compensation_ms: i32) -> Self {
        Self {
            external_pitch_offset,
            latency_compensation_ms,
        }
    }

    pub fn latency_compensation_ms(&self) -> i32 {
        self.latency_compensation_ms
    }

    /// Apply latency compensation to a session-clock timestamp
    pub fn compensate(&self, timestamp_ms: f64) -> f64 {
        timestamp_ms - self.latency_compensation_ms as f64
    }

    /// Returns `None` for anything that is not a note event, or has no usable timestamp
    pub fn normalize(&self, raw: &RawInput) -> Option<NormalizedEvent> {
        let timestamp_ms = match raw {
            RawInput::Midi { timestamp_ms, .. } | RawInput::Key { timestamp_ms, .. } => {
                *timestamp_ms
            }
        };
        if !timestamp_ms.is_finite() {
            log::debug!("Dropped input with timestamp {}", timestamp_ms);
            return None;
        }

        match raw {
            RawInput::Midi {
                bytes,
                timestamp_ms,
            } => {
                let Some(event) = MidiEvent::from_bytes(bytes) else {
                    log::trace!("Dropped non-note MIDI message {:02X?}", bytes);
                    return None;
                };
                let (is_note_on, velocity) = match event {
                    MidiEvent::NoteOn { velocity, .. } => (true, velocity),
                    MidiEvent::NoteOff { .. } => (false, 0),
                };
                Some(NormalizedEvent {
                    pitch: event.note() as i32 + self.external_pitch_offset,
                    is_note_on,
                    velocity,
                    timestamp_ms: self.compensate(*timestamp_ms),
                    source_is_external: true,
                })
            }
            RawInput::Key {
                pitch,
                is_note_on,
                velocity,
                timestamp_ms,
            } => Some(NormalizedEvent {
                pitch: *pitch,
                is_note_on: *is_note_on && *velocity > 0,
                velocity: *velocity,
                timestamp_ms: self.compensate(*timestamp_ms),
                source_is_external: false,
            }),
        }
    }
}

impl Default for EventNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_EXTERNAL_PITCH_OFFSET, 0)
    }
}
