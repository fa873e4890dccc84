// Session - one practice or calibration take, from first click to notation
//
// A session owns its beat timeline, the sounding-notes table and the recorded
// notes. It is driven from a single thread: `tick` for the lookahead check,
// `handle_input` for device events, `stop` once. Nothing is shared between
// sessions.

pub mod calibration;
pub mod runner;
pub mod trainer;

pub use calibration::{CalibrationError, calibration_config, estimate_latency};
pub use runner::{SessionClock, SessionRunner};
pub use trainer::Trainer;

use crate::audio::timing::AudioClock;
use crate::midi::normalizer::{EventNormalizer, RawInput};
use crate::notation::assembler::{Notation, assemble};
use crate::sequencer::metronome::ClickType;
use crate::sequencer::note::RecordedNote;
use crate::sequencer::recorder::{RecorderOutcome, TakeRecorder};
use crate::sequencer::scheduler::{BeatInstant, BeatScheduler, SchedulerError};
use crate::sequencer::timeline::{ConfigError, SessionConfig};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Audio clock unavailable: cannot schedule beats")]
    AudioClockUnavailable,

    #[error("A session is already active")]
    AlreadyActive,

    #[error("No active session")]
    NotActive,

    #[error("Invalid session configuration: {0}")]
    Config(#[from] ConfigError),

    /// Audio clock went away mid-session; carries what was recorded up to then
    #[error("Audio clock lost, session aborted after {} notes", .0.notes.len())]
    ClockLost(Box<SessionReport>),
}

impl From<SchedulerError> for SessionError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::AudioClockUnavailable => SessionError::AudioClockUnavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Practice,
    /// Compensation forced to 0; the take's mean deviation becomes the new constant
    Calibration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Stopped,
}

/// Audible feedback collaborator. Fire-and-forget; never reads session state.
pub trait FeedbackSink: Send {
    /// Metronome click at an audio-clock time (seconds)
    fn click(&mut self, click_type: ClickType, audio_time: f64);

    /// Monitor the performer's own notes
    fn note(&mut self, pitch: i32, velocity: u8, on: bool);

    /// Drop clicks scheduled but not yet sounded
    fn cancel_pending(&mut self) {}
}

/// Feedback sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn click(&mut self, _click_type: ClickType, _audio_time: f64) {}

    fn note(&mut self, _pitch: i32, _velocity: u8, _on: bool) {}
}

/// What a stopped session leaves behind
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub mode: SessionMode,
    pub config: SessionConfig,
    pub notes: Vec<RecordedNote>,
    pub notation: Notation,
    pub beats_scheduled: u32,
    /// Set for calibration sessions only
    pub calibration: Option<Result<i32, CalibrationError>>,
}

pub struct Session {
    config: SessionConfig,
    mode: SessionMode,
    state: SessionState,
    scheduler: BeatScheduler,
    normalizer: EventNormalizer,
    recorder: TakeRecorder,
    timeline: Vec<BeatInstant>,
}

impl Session {
    /// Start a session; fails when the audio clock is not running
    pub fn start(
        mut config: SessionConfig,
        mode: SessionMode,
        external_pitch_offset: i32,
        clock: &dyn AudioClock,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if mode == SessionMode::Calibration {
            config.latency_compensation_ms = 0;
        }

        let scheduler = BeatScheduler::start(&config, clock)?;
        log::info!("Session started ({:?}): {}", mode, config);

        Ok(Self {
            normalizer: EventNormalizer::new(external_pitch_offset, config.latency_compensation_ms),
            recorder: TakeRecorder::new(config),
            timeline: Vec::with_capacity(config.total_beats() as usize),
            scheduler,
            config,
            mode,
            state: SessionState::Active,
        })
    }

    /// Lookahead check. Returns `true` once the deferred stop is due.
    pub fn tick(
        &mut self,
        audio_now: f64,
        wall_now_ms: f64,
        feedback: &mut dyn FeedbackSink,
    ) -> bool {
        if self.state != SessionState::Active {
            return false;
        }

        let tick = self.scheduler.tick(audio_now, wall_now_ms);
        for scheduled in &tick.beats {
            feedback.click(scheduled.click_type, scheduled.audio_time);
            self.timeline.push(scheduled.beat);
        }
        if tick.intro_complete {
            log::info!("Intro complete, recording armed");
        }
        tick.session_complete
    }

    /// Feed one raw device event through normalization and capture
    pub fn handle_input(
        &mut self,
        raw: &RawInput,
        feedback: &mut dyn FeedbackSink,
    ) -> RecorderOutcome {
        if self.state != SessionState::Active {
            return RecorderOutcome::Ignored;
        }
        let Some(event) = self.normalizer.normalize(raw) else {
            return RecorderOutcome::Ignored;
        };

        feedback.note(event.pitch, event.velocity, event.is_note_on);
        self.recorder.process_event(
            &event,
            &self.timeline,
            self.scheduler.is_recording_armed(),
        )
    }

    /// Single cancellation point: cancel beats, flush held notes, then
    /// aggregate calibration. `wall_now_ms` is the uncompensated stop instant.
    pub fn stop(&mut self, wall_now_ms: f64) -> Result<SessionReport, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }

        self.scheduler.stop();

        let flushed = self
            .recorder
            .finalize_recording(self.normalizer.compensate(wall_now_ms));
        if !flushed.is_empty() {
            log::debug!("Flushed {} held notes at stop", flushed.len());
        }

        let notes = self.recorder.take_recorded_notes();
        let calibration = match self.mode {
            SessionMode::Calibration => Some(estimate_latency(&notes)),
            SessionMode::Practice => None,
        };

        self.state = SessionState::Stopped;
        log::info!(
            "Session stopped: {} notes over {} beats",
            notes.len(),
            self.scheduler.beats_scheduled()
        );

        Ok(SessionReport {
            mode: self.mode,
            config: self.config,
            notation: assemble(&notes, &self.config),
            notes,
            beats_scheduled: self.scheduler.beats_scheduled(),
            calibration,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_recording_armed(&self) -> bool {
        self.scheduler.is_recording_armed()
    }

    /// Beats generated so far
    pub fn timeline(&self) -> &[BeatInstant] {
        &self.timeline
    }

    pub fn recorded_notes(&self) -> &[RecordedNote] {
        self.recorder.recorded_notes()
    }

    pub fn held_note_count(&self) -> usize {
        self.recorder.active_note_count()
    }
}
