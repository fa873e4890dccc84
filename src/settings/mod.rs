// Settings - persisted practice preferences
// Snapshotted into an immutable SessionConfig whenever a session starts

pub mod store;

pub use store::SettingsStore;

use crate::midi::normalizer::DEFAULT_EXTERNAL_PITCH_OFFSET;
use crate::sequencer::timeline::{ConfigError, SessionConfig, TimeSignature};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("No configuration directory on this platform")]
    NoConfigDir,

    #[error("Invalid settings: {0}")]
    Invalid(#[from] ConfigError),

    #[error("Metronome volume must be between 0.0 and 1.0 (got {0})")]
    InvalidVolume(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tempo_bpm: f64,
    pub time_signature: TimeSignature,
    pub measure_count: u32,
    /// Subtracted from every input timestamp; written by calibration
    pub latency_compensation_ms: i32,
    /// Semitones added to notes from external MIDI devices
    pub external_pitch_offset: i32,
    pub metronome_volume: f32,
    /// Preferred MIDI input port (substring match); first port when unset
    pub midi_port: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self {
            tempo_bpm: config.tempo.bpm(),
            time_signature: config.time_signature,
            measure_count: config.measure_count,
            latency_compensation_ms: 0,
            external_pitch_offset: DEFAULT_EXTERNAL_PITCH_OFFSET,
            metronome_volume: 0.5,
            midi_port: None,
        }
    }
}

impl Settings {
    /// Immutable configuration for the next session
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        SessionConfig::new(
            self.tempo_bpm,
            self.time_signature,
            self.measure_count,
            self.latency_compensation_ms,
        )
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.session_config()?;
        if !(0.0..=1.0).contains(&self.metronome_volume) {
            return Err(SettingsError::InvalidVolume(self.metronome_volume));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.external_pitch_offset, -12);

        let config = settings.session_config().unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let settings = Settings {
            tempo_bpm: 500.0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid(ConfigError::InvalidTempo(_)))
        ));

        let settings = Settings {
            metronome_volume: 1.5,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidVolume(_))
        ));
    }

    #[test]
    fn test_latency_flows_into_session_config() {
        let settings = Settings {
            latency_compensation_ms: 42,
            ..Settings::default()
        };
        assert_eq!(settings.session_config().unwrap().latency_compensation_ms, 42);
    }
}
