// Note representation for a recorded take
// A note is a pitch snapped onto the subdivision grid, plus how far off the grid it was played

use crate::sequencer::timeline::SessionConfig;
use serde::{Deserialize, Serialize};

/// A slot on the subdivision grid of the recorded part of a session
///
/// `measure` is signed because a quantized position may land before the first
/// recorded measure; such positions never become notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub measure: i64,
    pub beat: u32,
    pub subdivision: u32,
}

impl GridPosition {
    pub fn new(measure: i64, beat: u32, subdivision: u32) -> Self {
        Self {
            measure,
            beat,
            subdivision,
        }
    }

    /// Position counted in subdivisions from the first recorded downbeat
    pub fn absolute_subdivision(&self, config: &SessionConfig) -> i64 {
        self.measure * config.subdivisions_per_measure() as i64
            + (self.beat * config.subdivisions_per_beat()) as i64
            + self.subdivision as i64
    }

    /// Whether the position lies inside the configured measures
    pub fn is_within(&self, config: &SessionConfig) -> bool {
        self.measure >= 0 && self.measure < config.measure_count as i64
    }
}

/// A note that is currently held down
///
/// Created on a quantized note-on, consumed by the matching note-off or by the
/// flush when the session stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveNoteEntry {
    pub start_timestamp_ms: f64,
    pub position: GridPosition,
    /// Signed distance to the nearest grid line (negative = early)
    pub deviation_ms: f64,
}

/// A finished note of the take
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedNote {
    /// MIDI-style note number after pitch offset correction
    pub pitch: i32,
    pub deviation_ms: f64,
    pub measure: u32,
    pub beat: u32,
    pub subdivision: u32,
    /// Always >= 1
    pub duration_subdivisions: u32,
}

impl RecordedNote {
    pub fn new(
        pitch: i32,
        position: GridPosition,
        duration_subdivisions: u32,
        deviation_ms: f64,
    ) -> Self {
        assert!(position.measure >= 0, "Recorded note measure must be >= 0");
        assert!(duration_subdivisions > 0, "Note duration must be > 0");

        Self {
            pitch,
            deviation_ms,
            measure: position.measure as u32,
            beat: position.beat,
            subdivision: position.subdivision,
            duration_subdivisions,
        }
    }

    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.measure as i64, self.beat, self.subdivision)
    }

    pub fn absolute_subdivision(&self, config: &SessionConfig) -> i64 {
        self.position().absolute_subdivision(config)
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        note_name(self.pitch)
    }
}

/// Note name for a MIDI-style pitch (60 = C4)
pub fn note_name(pitch: i32) -> String {
    const NOTE_NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];

    let octave = pitch.div_euclid(12) - 1;
    let note_index = pitch.rem_euclid(12) as usize;

    format!("{}{}", NOTE_NAMES[note_index], octave)
}
