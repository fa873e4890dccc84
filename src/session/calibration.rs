// Latency calibration - estimate the input latency from a take played on the click

use crate::sequencer::note::RecordedNote;
use crate::sequencer::timeline::{ConfigError, SessionConfig, TimeSignature, round_half_up};

pub const CALIBRATION_TEMPO_BPM: f64 = 100.0;
pub const CALIBRATION_MEASURES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationError {
    #[error("No notes captured during calibration, latency left unchanged")]
    NoNotesCaptured,
}

/// Fixed take the performer plays along to: 4/4, 100 BPM, 4 measures, no compensation
pub fn calibration_config() -> Result<SessionConfig, ConfigError> {
    SessionConfig::new(
        CALIBRATION_TEMPO_BPM,
        TimeSignature::four_four(),
        CALIBRATION_MEASURES,
        0,
    )
}

/// Mean deviation of the take, rounded to whole milliseconds
pub fn estimate_latency(notes: &[RecordedNote]) -> Result<i32, CalibrationError> {
    if notes.is_empty() {
        return Err(CalibrationError::NoNotesCaptured);
    }

    let mean = notes.iter().map(|n| n.deviation_ms).sum::<f64>() / notes.len() as f64;
    let latency = round_half_up(mean) as i32;
    log::info!(
        "Calibration: {} notes, mean deviation {:.2} ms -> {} ms",
        notes.len(),
        mean,
        latency
    );
    Ok(latency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::GridPosition;

    fn notes_with(deviations: &[f64]) -> Vec<RecordedNote> {
        deviations
            .iter()
            .enumerate()
            .map(|(i, &d)| RecordedNote::new(60, GridPosition::new(0, i as u32 % 4, 0), 4, d))
            .collect()
    }

    #[test]
    fn test_calibration_config() {
        let config = calibration_config().unwrap();
        assert_eq!(config.tempo.bpm(), 100.0);
        assert_eq!(config.time_signature, TimeSignature::four_four());
        assert_eq!(config.measure_count, 4);
        assert_eq!(config.latency_compensation_ms, 0);
    }

    #[test]
    fn test_convergence_around_true_latency() {
        let latency = 42.0;
        let notes = notes_with(&[latency + 10.0, latency - 10.0, latency + 10.0, latency - 10.0]);
        assert_eq!(estimate_latency(&notes), Ok(42));
    }

    #[test]
    fn test_mean_rounds_half_up() {
        assert_eq!(estimate_latency(&notes_with(&[20.0, 21.0])), Ok(21));
        assert_eq!(estimate_latency(&notes_with(&[-20.0, -21.0])), Ok(-20));
        assert_eq!(estimate_latency(&notes_with(&[-12.4])), Ok(-12));
    }

    #[test]
    fn test_no_notes_is_an_error() {
        assert_eq!(estimate_latency(&[]), Err(CalibrationError::NoNotesCaptured));
    }
}
