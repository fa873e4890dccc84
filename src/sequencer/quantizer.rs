// Grid quantizer - snaps note onsets onto the session's subdivision grid
//
// The beat timeline gives the predicted wall-clock instant of every scheduled
// beat. A note-on is matched to the closest post-intro beat first, then to the
// nearest subdivision around it, carrying into the neighbouring beat when the
// rounded subdivision falls outside the beat.

use crate::sequencer::note::GridPosition;
use crate::sequencer::scheduler::BeatInstant;
use crate::sequencer::timeline::{SessionConfig, round_half_up};

/// Where an onset landed and how far off it was
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantized {
    pub position: GridPosition,
    /// Residual after snapping: negative = early, positive = late
    pub deviation_ms: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GridQuantizer {
    beats_per_measure: u32,
    subdivisions_per_beat: u32,
    subdivision_duration_ms: f64,
}

impl GridQuantizer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            beats_per_measure: config.beats_per_measure(),
            subdivisions_per_beat: config.subdivisions_per_beat(),
            subdivision_duration_ms: config.subdivision_duration_ms(),
        }
    }

    pub fn subdivision_duration_ms(&self) -> f64 {
        self.subdivision_duration_ms
    }

    /// Closest post-intro beat to `timestamp_ms`; ties keep the earlier beat
    fn nearest_beat<'a>(
        &self,
        timestamp_ms: f64,
        timeline: &'a [BeatInstant],
    ) -> Option<&'a BeatInstant> {
        let mut best: Option<&BeatInstant> = None;
        for beat in timeline
            .iter()
            .filter(|b| b.sequence_index >= self.beats_per_measure)
        {
            let distance = (timestamp_ms - beat.predicted_time_ms).abs();
            match best {
                Some(current) if (timestamp_ms - current.predicted_time_ms).abs() <= distance => {}
                _ => best = Some(beat),
            }
        }
        best
    }

    /// Snap an onset onto the grid
    ///
    /// Returns `None` when no post-intro beat has been scheduled yet or when the
    /// onset lands before the first recorded beat (pre-roll).
    pub fn quantize(&self, timestamp_ms: f64, timeline: &[BeatInstant]) -> Option<Quantized> {
        let target = self.nearest_beat(timestamp_ms, timeline)?;

        let mut beat_index = target.sequence_index as i64 - self.beats_per_measure as i64;
        let raw_offset_ms = timestamp_ms - target.predicted_time_ms;
        let snapped = round_half_up(raw_offset_ms / self.subdivision_duration_ms) as i64;

        // Carry into later beats, borrow from earlier ones
        let per_beat = self.subdivisions_per_beat as i64;
        beat_index += snapped.div_euclid(per_beat);
        let subdivision = snapped.rem_euclid(per_beat);

        if beat_index < 0 {
            return None;
        }

        let per_measure = self.beats_per_measure as i64;
        Some(Quantized {
            position: GridPosition::new(
                beat_index / per_measure,
                (beat_index % per_measure) as u32,
                subdivision as u32,
            ),
            deviation_ms: raw_offset_ms - snapped as f64 * self.subdivision_duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::TimeSignature;

    const START_MS: f64 = 1000.0;

    /// Timeline as the scheduler would predict it with steady clocks
    fn timeline(config: &SessionConfig) -> Vec<BeatInstant> {
        (0..config.total_beats())
            .map(|i| BeatInstant {
                sequence_index: i,
                predicted_time_ms: START_MS + i as f64 * config.tempo.beat_duration_ms(),
            })
            .collect()
    }

    /// Wall-clock instant of a grid slot of the recorded part
    fn grid_time(config: &SessionConfig, measure: u32, beat: u32, subdivision: u32) -> f64 {
        let beat_index = config.beats_per_measure() * (measure + 1) + beat;
        START_MS
            + beat_index as f64 * config.tempo.beat_duration_ms()
            + subdivision as f64 * config.subdivision_duration_ms()
    }

    #[test]
    fn test_grid_round_trip() {
        for ts in [
            TimeSignature::four_four(),
            TimeSignature::three_four(),
            TimeSignature::six_eight(),
            TimeSignature::new(2, 2).unwrap(),
        ] {
            let config = SessionConfig::new(97.0, ts, 3, 0).unwrap();
            let quantizer = GridQuantizer::new(&config);
            let beats = timeline(&config);

            for measure in 0..config.measure_count {
                for beat in 0..config.beats_per_measure() {
                    for subdivision in 0..config.subdivisions_per_beat() {
                        let ts_ms = grid_time(&config, measure, beat, subdivision);
                        let q = quantizer.quantize(ts_ms, &beats).unwrap();

                        assert_eq!(
                            q.position,
                            GridPosition::new(measure as i64, beat, subdivision),
                            "{} m{} b{} s{}",
                            ts,
                            measure,
                            beat,
                            subdivision
                        );
                        assert!(q.deviation_ms.abs() < 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_wraparound_borrows_previous_beat() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 2, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        // One subdivision before post-intro beat index k
        for k in 1..8u32 {
            let beat_time = START_MS + (k + 4) as f64 * 500.0;
            let q = quantizer.quantize(beat_time - 125.0, &beats).unwrap();

            let expected = k - 1;
            assert_eq!(q.position.measure, (expected / 4) as i64);
            assert_eq!(q.position.beat, expected % 4);
            assert_eq!(q.position.subdivision, 3);
        }
    }

    #[test]
    fn test_nearer_next_beat_is_preferred() {
        // 0.8 of a beat after the downbeat is measured from beat 2
        let config = SessionConfig::new(60.0, TimeSignature::six_eight(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        let downbeat = START_MS + 6.0 * 1000.0;
        let q = quantizer.quantize(downbeat + 800.0, &beats).unwrap();
        assert_eq!(q.position, GridPosition::new(0, 1, 0));
        assert!((q.deviation_ms + 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_wraparound_carries_past_last_scheduled_beat() {
        // Only the first downbeat is scheduled so far; an onset 1.6 beats
        // later rounds to subdivision 3 of a 2-subdivision beat and carries.
        let config = SessionConfig::new(60.0, TimeSignature::six_eight(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats: Vec<BeatInstant> = timeline(&config).into_iter().take(7).collect();

        let downbeat = START_MS + 6.0 * 1000.0;
        let q = quantizer.quantize(downbeat + 1600.0, &beats).unwrap();
        assert_eq!(q.position, GridPosition::new(0, 1, 1));
        assert!((q.deviation_ms - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_deviation_is_residual_to_nearest_line() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        // 20 ms late on the second sixteenth of beat 2
        let late = grid_time(&config, 0, 1, 1) + 20.0;
        let q = quantizer.quantize(late, &beats).unwrap();
        assert_eq!(q.position, GridPosition::new(0, 1, 1));
        assert!((q.deviation_ms - 20.0).abs() < 1e-6);

        // 40 ms early on beat 3
        let early = grid_time(&config, 0, 2, 0) - 40.0;
        let q = quantizer.quantize(early, &beats).unwrap();
        assert_eq!(q.position, GridPosition::new(0, 2, 0));
        assert!((q.deviation_ms + 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_half_subdivision_rounds_up() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        let halfway = grid_time(&config, 0, 0, 0) + 62.5;
        let q = quantizer.quantize(halfway, &beats).unwrap();
        assert_eq!(q.position, GridPosition::new(0, 0, 1));
        assert!((q.deviation_ms + 62.5).abs() < 1e-6);
    }

    #[test]
    fn test_intro_beats_are_ignored() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        // Right on intro beat 2: nearest eligible beat is the first downbeat,
        // and borrowing back from it lands before the recording
        assert!(quantizer.quantize(START_MS + 500.0, &beats).is_none());

        // One sixteenth before the downbeat is still pre-roll
        assert!(quantizer.quantize(START_MS + 2000.0 - 125.0, &beats).is_none());
    }

    #[test]
    fn test_no_eligible_beat_yet() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let intro_only: Vec<BeatInstant> = timeline(&config).into_iter().take(4).collect();

        assert!(quantizer.quantize(START_MS + 1900.0, &intro_only).is_none());
        assert!(quantizer.quantize(START_MS, &[]).is_none());
    }

    #[test]
    fn test_late_note_past_timeline_lands_beyond_last_measure() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        // Well after the last beat: position is outside the session
        let q = quantizer.quantize(START_MS + 4000.0, &beats).unwrap();
        assert_eq!(q.position.measure, 1);
        assert!(!q.position.is_within(&config));
    }

    #[test]
    fn test_far_off_timestamps_resolve_in_one_step() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 2, 0).unwrap();
        let quantizer = GridQuantizer::new(&config);
        let beats = timeline(&config);

        // 8e12 subdivisions past the last beat
        let q = quantizer.quantize(1.0e15, &beats).unwrap();
        assert!(q.position.measure > 1_000_000_000);
        assert!(q.position.subdivision < config.subdivisions_per_beat());
        assert!(!q.position.is_within(&config));

        // Equally far before the first beat: pre-roll
        assert_eq!(quantizer.quantize(-1.0e15, &beats), None);
    }
}
