// Notation tokens - the unit handed to a score renderer

use crate::sequencer::note::RecordedNote;
use serde::{Deserialize, Serialize};

/// |deviation| below this renders as on time
pub const PERFECT_THRESHOLD_MS: f64 = 35.0;

/// Durations a token may take, in subdivisions, longest first
pub const ALLOWED_DURATIONS: [u32; 5] = [16, 8, 4, 2, 1];

/// Largest allowed duration that does not exceed `value`
pub fn snap_duration(value: u32) -> Option<u32> {
    ALLOWED_DURATIONS.iter().copied().find(|&d| d <= value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Note,
    Chord,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationToken {
    pub kind: TokenKind,
    /// In capture order
    pub pitches: Vec<i32>,
    pub duration_subdivisions: u32,
    pub source_notes: Vec<RecordedNote>,
}

impl NotationToken {
    pub fn rest(duration_subdivisions: u32) -> Self {
        Self {
            kind: TokenKind::Rest,
            pitches: Vec::new(),
            duration_subdivisions,
            source_notes: Vec::new(),
        }
    }

    /// Note or chord for notes sharing a grid slot
    pub fn from_group(notes: Vec<RecordedNote>, duration_subdivisions: u32) -> Self {
        let kind = if notes.len() > 1 {
            TokenKind::Chord
        } else {
            TokenKind::Note
        };
        Self {
            kind,
            pitches: notes.iter().map(|n| n.pitch).collect(),
            duration_subdivisions,
            source_notes: notes,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.kind == TokenKind::Rest
    }

    /// Duration code for the renderer: the snapped subdivision count ("16", "8", "4", "2", "1")
    pub fn duration_code(&self) -> String {
        self.duration_subdivisions.to_string()
    }
}

/// How a note glyph should be colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingClass {
    OnTime,
    Early,
    Late,
}

impl TimingClass {
    pub fn classify(deviation_ms: f64) -> Self {
        if deviation_ms.abs() < PERFECT_THRESHOLD_MS {
            TimingClass::OnTime
        } else if deviation_ms < 0.0 {
            TimingClass::Early
        } else {
            TimingClass::Late
        }
    }
}

/// Per-token data for the renderer, index-aligned with the tokens
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// `None` for rests
    pub deviation_ms: Option<f64>,
}

impl TokenMetadata {
    pub fn timing_class(&self) -> Option<TimingClass> {
        self.deviation_ms.map(TimingClass::classify)
    }
}
