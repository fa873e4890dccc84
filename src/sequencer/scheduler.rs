// Beat scheduler - Lookahead metronome timeline
//
// The scheduler is polled every LOOKAHEAD_INTERVAL and schedules every beat whose
// audio-clock time falls inside the next SCHEDULE_AHEAD_SECONDS. Onsets are
// placed on the audio clock (sample accurate); the rest of the system only sees
// the predicted wall-clock instant of each beat, derived from the offset between
// the two clocks at scheduling time.

use crate::audio::timing::AudioClock;
use crate::sequencer::metronome::ClickType;
use crate::sequencer::timeline::SessionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often the lookahead check is re-armed
pub const LOOKAHEAD_INTERVAL: Duration = Duration::from_millis(25);

/// How far ahead of the audio clock beats are scheduled
pub const SCHEDULE_AHEAD_SECONDS: f64 = 0.1;

/// Gap between `start` and the first beat
pub const START_DELAY_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Audio clock unavailable: cannot schedule beats")]
    AudioClockUnavailable,
}

/// One generated metronome beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatInstant {
    /// 0-based, counted from the first intro beat
    pub sequence_index: u32,
    /// Wall-clock instant (session clock, ms) the beat is expected to sound
    pub predicted_time_ms: f64,
}

/// A beat handed to the audio side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBeat {
    pub beat: BeatInstant,
    pub audio_time: f64,
    pub click_type: ClickType,
}

/// Result of one lookahead check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerTick {
    /// Beats scheduled during this check, in order
    pub beats: Vec<ScheduledBeat>,
    /// The last intro beat was scheduled during this check
    pub intro_complete: bool,
    /// The deferred stop is due
    pub session_complete: bool,
}

/// Metronome beat scheduler
/// Generates the beat timeline of one session, ahead of real time
#[derive(Debug, Clone)]
pub struct BeatScheduler {
    beat_duration_seconds: f64,
    beats_per_measure: u32,
    total_beats: u32,

    next_beat_audio_time: f64,
    beats_scheduled: u32,
    running: bool,
    recording_armed: bool,
    stop_at_ms: Option<f64>,
}

impl BeatScheduler {
    /// Start a new timeline; the first beat sounds START_DELAY_SECONDS from now
    pub fn start(config: &SessionConfig, clock: &dyn AudioClock) -> Result<Self, SchedulerError> {
        let audio_now = clock
            .now_seconds()
            .ok_or(SchedulerError::AudioClockUnavailable)?;

        Ok(Self {
            beat_duration_seconds: config.tempo.beat_duration_seconds(),
            beats_per_measure: config.beats_per_measure(),
            total_beats: config.total_beats(),
            next_beat_audio_time: audio_now + START_DELAY_SECONDS,
            beats_scheduled: 0,
            running: true,
            recording_armed: false,
            stop_at_ms: None,
        })
    }

    /// Run one lookahead check
    pub fn tick(&mut self, audio_now: f64, wall_now_ms: f64) -> SchedulerTick {
        let mut tick = SchedulerTick::default();
        if !self.running {
            return tick;
        }

        while self.beats_scheduled < self.total_beats
            && self.next_beat_audio_time < audio_now + SCHEDULE_AHEAD_SECONDS
        {
            let sequence_index = self.beats_scheduled;
            let click_type = if sequence_index % self.beats_per_measure == 0 {
                ClickType::Accent
            } else {
                ClickType::Regular
            };

            tick.beats.push(ScheduledBeat {
                beat: BeatInstant {
                    sequence_index,
                    predicted_time_ms: Self::to_wall_ms(
                        self.next_beat_audio_time,
                        audio_now,
                        wall_now_ms,
                    ),
                },
                audio_time: self.next_beat_audio_time,
                click_type,
            });

            self.next_beat_audio_time += self.beat_duration_seconds;
            self.beats_scheduled += 1;

            // Intro = one full measure plus the first recorded downbeat
            if !self.recording_armed && self.beats_scheduled > self.beats_per_measure {
                self.recording_armed = true;
                tick.intro_complete = true;
            }

            if self.beats_scheduled == self.total_beats {
                // Stop once the last counted beat has fully elapsed
                self.stop_at_ms = Some(Self::to_wall_ms(
                    self.next_beat_audio_time,
                    audio_now,
                    wall_now_ms,
                ));
            }
        }

        if let Some(stop_at_ms) = self.stop_at_ms {
            if wall_now_ms >= stop_at_ms {
                tick.session_complete = true;
            }
        }

        tick
    }

    /// Halt generation; beats not yet scheduled are cancelled
    pub fn stop(&mut self) {
        self.running = false;
        self.stop_at_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_recording_armed(&self) -> bool {
        self.recording_armed
    }

    pub fn beats_scheduled(&self) -> u32 {
        self.beats_scheduled
    }

    /// Wall-clock instant of the deferred stop, once the last beat is scheduled
    pub fn stop_at_ms(&self) -> Option<f64> {
        self.stop_at_ms
    }

    fn to_wall_ms(audio_time: f64, audio_now: f64, wall_now_ms: f64) -> f64 {
        wall_now_ms + (audio_time - audio_now) * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::timing::ManualClock;
    use crate::sequencer::timeline::TimeSignature;

    /// Poll the scheduler with both clocks advancing together
    fn run_for(
        scheduler: &mut BeatScheduler,
        from_seconds: f64,
        to_seconds: f64,
        wall_offset_ms: f64,
    ) -> (Vec<ScheduledBeat>, Vec<SchedulerTick>) {
        let mut beats = Vec::new();
        let mut ticks = Vec::new();
        let step = LOOKAHEAD_INTERVAL.as_secs_f64();
        let mut now = from_seconds;
        while now <= to_seconds {
            let tick = scheduler.tick(now, now * 1000.0 + wall_offset_ms);
            beats.extend(tick.beats.iter().copied());
            ticks.push(tick);
            now += step;
        }
        (beats, ticks)
    }

    #[test]
    fn test_missing_audio_clock_is_fatal() {
        let config = SessionConfig::default();
        let result = BeatScheduler::start(&config, &ManualClock::unavailable());
        assert_eq!(result.unwrap_err(), SchedulerError::AudioClockUnavailable);
    }

    #[test]
    fn test_beats_scheduled_within_lookahead_window() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        // First beat at 0.1s is not strictly inside [0, 0.1)
        assert!(scheduler.tick(0.0, 5000.0).beats.is_empty());

        let tick = scheduler.tick(0.025, 5025.0);
        assert_eq!(tick.beats.len(), 1);
        assert_eq!(tick.beats[0].beat.sequence_index, 0);
        assert!((tick.beats[0].beat.predicted_time_ms - 5100.0).abs() < 1e-6);
        assert!((tick.beats[0].audio_time - 0.1).abs() < 1e-9);

        // Nothing new until the next beat enters the window
        assert!(scheduler.tick(0.05, 5050.0).beats.is_empty());
    }

    #[test]
    fn test_predicted_times_follow_tempo() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 2, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let (beats, _) = run_for(&mut scheduler, 0.0, 10.0, 1000.0);

        assert_eq!(beats.len(), 12);
        for (i, scheduled) in beats.iter().enumerate() {
            assert_eq!(scheduled.beat.sequence_index, i as u32);
            let expected = 1000.0 + 100.0 + 500.0 * i as f64;
            assert!((scheduled.beat.predicted_time_ms - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_accent_pattern() {
        let config = SessionConfig::new(120.0, TimeSignature::three_four(), 1, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let (beats, _) = run_for(&mut scheduler, 0.0, 5.0, 0.0);
        let clicks: Vec<ClickType> = beats.iter().map(|b| b.click_type).collect();

        assert_eq!(
            clicks,
            vec![
                ClickType::Accent,
                ClickType::Regular,
                ClickType::Regular,
                ClickType::Accent,
                ClickType::Regular,
                ClickType::Regular,
            ]
        );
    }

    #[test]
    fn test_recording_armed_after_intro() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 2, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let mut scheduled = 0;
        let mut now = 0.0;
        while !scheduler.is_recording_armed() {
            let tick = scheduler.tick(now, now * 1000.0);
            scheduled += tick.beats.len();
            if tick.intro_complete {
                assert_eq!(scheduler.beats_scheduled(), 5);
            }
            now += 0.025;
        }

        assert_eq!(scheduled, 5);
    }

    #[test]
    fn test_deferred_stop_after_last_measure() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 1, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let (beats, ticks) = run_for(&mut scheduler, 0.0, 6.0, 0.0);

        // Intro measure + one recorded measure
        assert_eq!(beats.len(), 8);
        // Beat 8 would have sounded at 0.1 + 8 * 0.5 = 4.1s
        let stop_at = scheduler.stop_at_ms().unwrap();
        assert!((stop_at - 4100.0).abs() < 1e-6);

        let first_complete = ticks.iter().position(|t| t.session_complete).unwrap();
        let when = first_complete as f64 * 25.0;
        assert!(when >= 4100.0 - 1e-6 && when < 4125.0 + 1e-6);
    }

    #[test]
    fn test_stop_cancels_pending_beats() {
        let config = SessionConfig::new(120.0, TimeSignature::four_four(), 4, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let (beats, _) = run_for(&mut scheduler, 0.0, 1.0, 0.0);
        assert!(!beats.is_empty());

        scheduler.stop();
        assert!(!scheduler.is_running());

        let (after_stop, _) = run_for(&mut scheduler, 1.0, 10.0, 0.0);
        assert!(after_stop.is_empty());
    }

    #[test]
    fn test_lagging_poll_catches_up() {
        // A late lookahead check schedules every beat it missed, in order
        let config = SessionConfig::new(240.0, TimeSignature::four_four(), 1, 0).unwrap();
        let mut scheduler = BeatScheduler::start(&config, &ManualClock::new(0.0)).unwrap();

        let tick = scheduler.tick(0.6, 600.0);
        let indices: Vec<u32> = tick.beats.iter().map(|b| b.beat.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
