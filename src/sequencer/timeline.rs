// Timeline - Musical time representation for a practice session
// Handles the subdivision grid, tempo, and the immutable session configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration errors (tempo, time signature, session length)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Tempo must be between {min} and {max} BPM (got {0})", min = Tempo::MIN_BPM, max = Tempo::MAX_BPM)]
    InvalidTempo(f64),

    #[error("Unsupported beats per measure: {0}")]
    InvalidBeatsPerMeasure(u8),

    #[error("Unsupported beat unit: {0} (expected 2, 4 or 8)")]
    InvalidBeatUnit(u8),

    #[error("Measure count must be between 1 and {max} (got {0})", max = SessionConfig::MAX_MEASURES)]
    InvalidMeasureCount(u32),

    #[error("Cannot parse time signature '{0}' (expected e.g. 4/4)")]
    Unparseable(String),
}

/// Round to nearest, halves toward positive infinity (2.5 -> 3, -2.5 -> -2)
#[inline]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Time signature (beats per measure / beat unit)
/// Example: 6/8 = TimeSignature { beats_per_measure: 6, beat_unit: 8 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats_per_measure: u8,
    pub beat_unit: u8,
}

impl TimeSignature {
    /// Numerators offered to the performer
    pub const ALLOWED_BEATS: [u8; 7] = [1, 2, 3, 4, 6, 9, 12];
    /// Denominators offered to the performer
    pub const ALLOWED_UNITS: [u8; 3] = [2, 4, 8];

    /// Creates a new time signature
    pub fn new(beats_per_measure: u8, beat_unit: u8) -> Result<Self, ConfigError> {
        if !Self::ALLOWED_BEATS.contains(&beats_per_measure) {
            return Err(ConfigError::InvalidBeatsPerMeasure(beats_per_measure));
        }
        if !Self::ALLOWED_UNITS.contains(&beat_unit) {
            return Err(ConfigError::InvalidBeatUnit(beat_unit));
        }
        Ok(Self {
            beats_per_measure,
            beat_unit,
        })
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self {
            beats_per_measure: 4,
            beat_unit: 4,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self {
            beats_per_measure: 3,
            beat_unit: 4,
        }
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self {
            beats_per_measure: 6,
            beat_unit: 8,
        }
    }

    /// Re-check a value that did not go through `new` (e.g. deserialized)
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.beats_per_measure, self.beat_unit).map(|_| ())
    }

    /// Sixteenth-note slots per beat: 16 / beat_unit
    pub fn subdivisions_per_beat(&self) -> u32 {
        16 / self.beat_unit as u32
    }

    /// Sixteenth-note slots per measure
    pub fn subdivisions_per_measure(&self) -> u32 {
        self.beats_per_measure as u32 * self.subdivisions_per_beat()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

impl FromStr for TimeSignature {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (beats, unit) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::Unparseable(s.to_string()))?;
        let beats = beats
            .trim()
            .parse::<u8>()
            .map_err(|_| ConfigError::Unparseable(s.to_string()))?;
        let unit = unit
            .trim()
            .parse::<u8>()
            .map_err(|_| ConfigError::Unparseable(s.to_string()))?;
        Self::new(beats, unit)
    }
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 40.0;
    pub const MAX_BPM: f64 = 240.0;

    /// Creates a new tempo
    /// BPM must be in range [40.0, 240.0]
    pub fn new(bpm: f64) -> Result<Self, ConfigError> {
        if !(Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            return Err(ConfigError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one beat in milliseconds
    pub fn beat_duration_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Duration of one grid subdivision in milliseconds
    pub fn subdivision_duration_ms(&self, time_signature: &TimeSignature) -> f64 {
        self.beat_duration_ms() / time_signature.subdivisions_per_beat() as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Everything a session needs to know up front.
///
/// Snapshotted when the session starts; control changes made while a session
/// runs only apply to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub measure_count: u32,
    /// Subtracted from every incoming event timestamp
    pub latency_compensation_ms: i32,
}

impl SessionConfig {
    pub const MAX_MEASURES: u32 = 32;

    pub fn new(
        tempo_bpm: f64,
        time_signature: TimeSignature,
        measure_count: u32,
        latency_compensation_ms: i32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            tempo: Tempo::new(tempo_bpm)?,
            time_signature,
            measure_count,
            latency_compensation_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Tempo::new(self.tempo.bpm())?;
        self.time_signature.validate()?;
        if !(1..=Self::MAX_MEASURES).contains(&self.measure_count) {
            return Err(ConfigError::InvalidMeasureCount(self.measure_count));
        }
        Ok(())
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.time_signature.beats_per_measure as u32
    }

    pub fn subdivisions_per_beat(&self) -> u32 {
        self.time_signature.subdivisions_per_beat()
    }

    pub fn subdivisions_per_measure(&self) -> u32 {
        self.time_signature.subdivisions_per_measure()
    }

    pub fn subdivision_duration_ms(&self) -> f64 {
        self.tempo.subdivision_duration_ms(&self.time_signature)
    }

    /// Length of the recorded part of the session, in subdivisions
    pub fn total_subdivisions(&self) -> u32 {
        self.measure_count * self.subdivisions_per_measure()
    }

    /// Beats generated over a whole session, intro measure included
    pub fn total_beats(&self) -> u32 {
        (self.measure_count + 1) * self.beats_per_measure()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            measure_count: 4,
            latency_compensation_ms: 0,
        }
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}, {} measures, latency {} ms",
            self.time_signature, self.tempo, self.measure_count, self.latency_compensation_ms
        )
    }
}
