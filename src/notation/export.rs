// Notation export - JSON snapshot of a finished take for external renderers

use crate::notation::assembler::Notation;
use crate::notation::token::{TimingClass, TokenKind};
use crate::sequencer::note::{RecordedNote, note_name};
use crate::sequencer::timeline::SessionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One token as a renderer consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedToken {
    pub kind: TokenKind,
    pub duration_code: String,
    pub pitches: Vec<i32>,
    pub pitch_names: Vec<String>,
    pub deviation_ms: Option<f64>,
    pub timing_class: Option<TimingClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotationExport {
    pub session_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub config: SessionConfig,
    /// Tokens grouped per measure
    pub measures: Vec<Vec<ExportedToken>>,
    pub notes: Vec<RecordedNote>,
}

impl NotationExport {
    pub fn new(config: SessionConfig, notes: &[RecordedNote], notation: &Notation) -> Self {
        let mut index = 0;
        let measures = notation
            .measures()
            .into_iter()
            .map(|measure| {
                measure
                    .iter()
                    .map(|token| {
                        let metadata = notation.metadata[index];
                        index += 1;
                        ExportedToken {
                            kind: token.kind,
                            duration_code: token.duration_code(),
                            pitches: token.pitches.clone(),
                            pitch_names: token.pitches.iter().map(|&p| note_name(p)).collect(),
                            deviation_ms: metadata.deviation_ms,
                            timing_class: metadata.timing_class(),
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            session_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            config,
            measures,
            notes: notes.to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write pretty JSON, creating parent directories as needed
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Notation exported to {}", path.display());
        Ok(())
    }
}
