// Take recorder - pairs note-on/note-off events into recorded notes
// Owns the sounding-notes table and the recorded-note set of one session

use crate::midi::normalizer::NormalizedEvent;
use crate::sequencer::note::{ActiveNoteEntry, RecordedNote};
use crate::sequencer::quantizer::GridQuantizer;
use crate::sequencer::scheduler::BeatInstant;
use crate::sequencer::timeline::{SessionConfig, round_half_up};
use std::collections::HashMap;

/// What a single event did to the take
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecorderOutcome {
    /// Note-on quantized and now sounding
    Started(ActiveNoteEntry),
    /// Note-off closed a sounding note inside the session
    Recorded(RecordedNote),
    /// Nothing changed (not armed, pre-roll, unmatched off, out of range)
    Ignored,
}

/// Held time in subdivisions, never below one
pub fn resolve_duration(start_ms: f64, end_ms: f64, subdivision_duration_ms: f64) -> u32 {
    round_half_up((end_ms - start_ms) / subdivision_duration_ms).max(1.0) as u32
}

pub struct TakeRecorder {
    config: SessionConfig,
    quantizer: GridQuantizer,
    active_notes: HashMap<i32, ActiveNoteEntry>, // pitch -> sounding note
    recorded_notes: Vec<RecordedNote>,
}

impl TakeRecorder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            quantizer: GridQuantizer::new(&config),
            config,
            active_notes: HashMap::new(),
            recorded_notes: Vec::new(),
        }
    }

    /// Route one normalized event; note-ons are only captured once `armed`
    pub fn process_event(
        &mut self,
        event: &NormalizedEvent,
        timeline: &[BeatInstant],
        armed: bool,
    ) -> RecorderOutcome {
        if event.is_note_on {
            if !armed {
                return RecorderOutcome::Ignored;
            }
            self.note_on(event, timeline)
                .map_or(RecorderOutcome::Ignored, RecorderOutcome::Started)
        } else {
            self.note_off(event)
                .map_or(RecorderOutcome::Ignored, RecorderOutcome::Recorded)
        }
    }

    /// Quantize a note-on and mark its pitch as sounding
    ///
    /// A second note-on for a pitch that is already sounding replaces the
    /// earlier entry.
    pub fn note_on(
        &mut self,
        event: &NormalizedEvent,
        timeline: &[BeatInstant],
    ) -> Option<ActiveNoteEntry> {
        let Some(quantized) = self.quantizer.quantize(event.timestamp_ms, timeline) else {
            log::debug!(
                "Note {} at {:.1} ms is before the first recorded beat, discarded",
                event.pitch,
                event.timestamp_ms
            );
            return None;
        };

        let entry = ActiveNoteEntry {
            start_timestamp_ms: event.timestamp_ms,
            position: quantized.position,
            deviation_ms: quantized.deviation_ms,
        };
        if self.active_notes.insert(event.pitch, entry).is_some() {
            log::debug!("Note {} re-triggered while sounding", event.pitch);
        }
        Some(entry)
    }

    /// Close the sounding note for this pitch
    pub fn note_off(&mut self, event: &NormalizedEvent) -> Option<RecordedNote> {
        let entry = self.active_notes.remove(&event.pitch)?;
        self.resolve(event.pitch, entry, event.timestamp_ms)
    }

    fn resolve(&mut self, pitch: i32, entry: ActiveNoteEntry, end_ms: f64) -> Option<RecordedNote> {
        if !entry.position.is_within(&self.config) {
            log::debug!(
                "Note {} in measure {} is outside the session, dropped",
                pitch,
                entry.position.measure
            );
            return None;
        }

        let duration = resolve_duration(
            entry.start_timestamp_ms,
            end_ms,
            self.quantizer.subdivision_duration_ms(),
        );
        let note = RecordedNote::new(pitch, entry.position, duration, entry.deviation_ms);
        self.recorded_notes.push(note);
        Some(note)
    }

    /// Close every note still held down at `off_timestamp_ms`
    /// Returns the notes this flush recorded
    pub fn finalize_recording(&mut self, off_timestamp_ms: f64) -> Vec<RecordedNote> {
        let mut held: Vec<(i32, ActiveNoteEntry)> = self.active_notes.drain().collect();
        held.sort_by(|a, b| a.1.start_timestamp_ms.total_cmp(&b.1.start_timestamp_ms));

        held.into_iter()
            .filter_map(|(pitch, entry)| self.resolve(pitch, entry, off_timestamp_ms))
            .collect()
    }

    pub fn recorded_notes(&self) -> &[RecordedNote] {
        &self.recorded_notes
    }

    pub fn take_recorded_notes(&mut self) -> Vec<RecordedNote> {
        std::mem::take(&mut self.recorded_notes)
    }

    pub fn active_note_count(&self) -> usize {
        self.active_notes.len()
    }

    pub fn clear(&mut self) {
        self.active_notes.clear();
        self.recorded_notes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::GridPosition;
    use crate::sequencer::timeline::TimeSignature;

    // 4/4 at 120 BPM: 500 ms beats, 125 ms subdivisions, downbeat at 2000 ms
    const DOWNBEAT_MS: f64 = 2000.0;

    fn setup(measures: u32) -> (TakeRecorder, Vec<BeatInstant>) {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), measures, 0).unwrap();
        let timeline = (0..config.total_beats())
            .map(|i| BeatInstant {
                sequence_index: i,
                predicted_time_ms: i as f64 * 500.0,
            })
            .collect();
        (TakeRecorder::new(config), timeline)
    }

    fn event(pitch: i32, is_note_on: bool, timestamp_ms: f64) -> NormalizedEvent {
        NormalizedEvent {
            pitch,
            is_note_on,
            velocity: if is_note_on { 100 } else { 0 },
            timestamp_ms,
            source_is_external: true,
        }
    }

    #[test]
    fn test_basic_recording() {
        let (mut recorder, timeline) = setup(1);

        let started = recorder.process_event(&event(60, true, DOWNBEAT_MS), &timeline, true);
        assert!(matches!(started, RecorderOutcome::Started(_)));
        assert_eq!(recorder.active_note_count(), 1);

        let done = recorder.process_event(&event(60, false, DOWNBEAT_MS + 1000.0), &timeline, true);
        let RecorderOutcome::Recorded(note) = done else {
            panic!("Expected a recorded note, got {:?}", done);
        };

        assert_eq!(note.pitch, 60);
        assert_eq!(note.position(), GridPosition::new(0, 0, 0));
        assert_eq!(note.duration_subdivisions, 8);
        assert_eq!(note.deviation_ms, 0.0);
        assert_eq!(recorder.recorded_notes(), &[note]);
        assert_eq!(recorder.active_note_count(), 0);
    }

    #[test]
    fn test_not_armed_ignores_note_on() {
        let (mut recorder, timeline) = setup(1);

        let outcome = recorder.process_event(&event(60, true, DOWNBEAT_MS), &timeline, false);
        assert_eq!(outcome, RecorderOutcome::Ignored);
        assert_eq!(recorder.active_note_count(), 0);
    }

    #[test]
    fn test_unmatched_note_off_ignored() {
        let (mut recorder, timeline) = setup(1);

        let outcome = recorder.process_event(&event(64, false, DOWNBEAT_MS), &timeline, true);
        assert_eq!(outcome, RecorderOutcome::Ignored);

        // Double off
        recorder.process_event(&event(60, true, DOWNBEAT_MS), &timeline, true);
        recorder.process_event(&event(60, false, DOWNBEAT_MS + 100.0), &timeline, true);
        let outcome = recorder.process_event(&event(60, false, DOWNBEAT_MS + 200.0), &timeline, true);
        assert_eq!(outcome, RecorderOutcome::Ignored);
        assert_eq!(recorder.recorded_notes().len(), 1);
    }

    #[test]
    fn test_duration_floor() {
        assert_eq!(resolve_duration(1000.0, 1000.0, 125.0), 1);
        assert_eq!(resolve_duration(1000.0, 1010.0, 125.0), 1);
        assert_eq!(resolve_duration(1000.0, 900.0, 125.0), 1);
        assert_eq!(resolve_duration(1000.0, 1000.0 + 62.5, 125.0), 1);
        assert_eq!(resolve_duration(1000.0, 1000.0 + 187.5, 125.0), 2);

        let (mut recorder, timeline) = setup(1);
        recorder.note_on(&event(60, true, DOWNBEAT_MS), &timeline);
        let note = recorder.note_off(&event(60, false, DOWNBEAT_MS)).unwrap();
        assert_eq!(note.duration_subdivisions, 1);
    }

    #[test]
    fn test_retrigger_overwrites_entry() {
        let (mut recorder, timeline) = setup(1);

        recorder.note_on(&event(60, true, DOWNBEAT_MS), &timeline);
        recorder.note_on(&event(60, true, DOWNBEAT_MS + 500.0), &timeline);
        assert_eq!(recorder.active_note_count(), 1);

        let note = recorder.note_off(&event(60, false, DOWNBEAT_MS + 750.0)).unwrap();
        assert_eq!(note.position(), GridPosition::new(0, 1, 0));
        assert_eq!(note.duration_subdivisions, 2);
    }

    #[test]
    fn test_notes_outside_session_dropped() {
        let (mut recorder, timeline) = setup(1);

        // First beat after the single recorded measure
        let entry = recorder.note_on(&event(60, true, DOWNBEAT_MS + 2000.0), &timeline);
        assert_eq!(entry.unwrap().position.measure, 1);

        assert!(recorder.note_off(&event(60, false, DOWNBEAT_MS + 2100.0)).is_none());
        assert!(recorder.recorded_notes().is_empty());
    }

    #[test]
    fn test_pre_roll_note_discarded() {
        let (mut recorder, timeline) = setup(1);

        let outcome = recorder.process_event(&event(60, true, DOWNBEAT_MS - 300.0), &timeline, true);
        assert_eq!(outcome, RecorderOutcome::Ignored);
        assert_eq!(recorder.active_note_count(), 0);
    }

    #[test]
    fn test_active_notes_closure() {
        let (mut recorder, timeline) = setup(2);

        recorder.note_on(&event(64, true, DOWNBEAT_MS + 500.0), &timeline);
        recorder.note_on(&event(60, true, DOWNBEAT_MS), &timeline);
        assert_eq!(recorder.active_note_count(), 2);

        // Finalize without NoteOff
        let flushed = recorder.finalize_recording(DOWNBEAT_MS + 1000.0);
        assert_eq!(flushed.len(), 2);
        assert_eq!(recorder.active_note_count(), 0);

        // Flushed in onset order
        assert_eq!(flushed[0].pitch, 60);
        assert_eq!(flushed[0].duration_subdivisions, 8);
        assert_eq!(flushed[1].pitch, 64);
        assert_eq!(flushed[1].duration_subdivisions, 4);
        assert_eq!(recorder.recorded_notes().len(), 2);

        // Next recording should start fresh
        recorder.clear();
        recorder.note_on(&event(65, true, DOWNBEAT_MS), &timeline);
        assert_eq!(recorder.active_note_count(), 1);
        assert!(recorder.recorded_notes().is_empty());
    }
}
