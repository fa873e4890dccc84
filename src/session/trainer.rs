// Trainer - session boundary: start, stop and calibrate
// Owns the settings, the clocks and at most one active session

use crate::audio::timing::AudioClock;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::midi::normalizer::RawInput;
use crate::sequencer::recorder::RecorderOutcome;
use crate::sequencer::timeline::SessionConfig;
use crate::session::calibration::calibration_config;
use crate::session::runner::SessionClock;
use crate::session::{FeedbackSink, Session, SessionError, SessionMode, SessionReport};
use crate::settings::{Settings, SettingsStore};
use ringbuf::traits::Producer;
use std::sync::{Arc, Mutex};

pub struct Trainer {
    settings: Settings,
    store: Option<SettingsStore>,
    clock: Arc<dyn AudioClock>,
    wall: SessionClock,
    feedback: Box<dyn FeedbackSink>,
    notifications: Option<Arc<Mutex<NotificationProducer>>>,
    session: Option<Session>,
}

impl Trainer {
    pub fn new(
        settings: Settings,
        clock: Arc<dyn AudioClock>,
        wall: SessionClock,
        feedback: Box<dyn FeedbackSink>,
    ) -> Self {
        Self {
            settings,
            store: None,
            clock,
            wall,
            feedback,
            notifications: None,
            session: None,
        }
    }

    /// Persist calibration results through this store
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Shared with the audio engine, as the channel has a single producer side
    pub fn with_notifications(mut self, notifications: Arc<Mutex<NotificationProducer>>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Changes apply from the next session on
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_active)
    }

    /// Start a practice session with the current settings
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        let config = self.settings.session_config()?;
        self.begin(config, SessionMode::Practice)
    }

    /// Start a calibration take; the result is applied when it stops
    pub fn calibrate_latency(&mut self) -> Result<(), SessionError> {
        let config = calibration_config()?;
        self.begin(config, SessionMode::Calibration)
    }

    fn begin(&mut self, config: SessionConfig, mode: SessionMode) -> Result<(), SessionError> {
        if self.is_active() {
            return Err(SessionError::AlreadyActive);
        }

        let session = match Session::start(
            config,
            mode,
            self.settings.external_pitch_offset,
            self.clock.as_ref(),
        ) {
            Ok(session) => session,
            Err(e) => {
                self.notify(Notification::error(
                    NotificationCategory::Session,
                    format!("Cannot start session: {}", e),
                ));
                return Err(e);
            }
        };

        self.session = Some(session);
        Ok(())
    }

    /// Stamped device input for the active session; ignored when idle
    pub fn handle_input(&mut self, raw: &RawInput) -> RecorderOutcome {
        match self.session.as_mut() {
            Some(session) => session.handle_input(raw, self.feedback.as_mut()),
            None => RecorderOutcome::Ignored,
        }
    }

    /// Lookahead check; returns the report once the session has ended by itself
    ///
    /// A lost audio clock stops the session; the take is returned inside
    /// `SessionError::ClockLost`.
    pub fn tick(&mut self) -> Result<Option<SessionReport>, SessionError> {
        if self.session.is_none() {
            return Ok(None);
        }

        let Some(audio_now) = self.clock.now_seconds() else {
            self.notify(Notification::error(
                NotificationCategory::Audio,
                "Audio clock lost, session aborted".to_string(),
            ));
            let report = self.stop_session()?;
            return Err(SessionError::ClockLost(Box::new(report)));
        };

        let wall_now_ms = self.wall.now_ms();
        let complete = match self.session.as_mut() {
            Some(session) => session.tick(audio_now, wall_now_ms, self.feedback.as_mut()),
            None => false,
        };
        if complete {
            return self.stop_session().map(Some);
        }
        Ok(None)
    }

    pub fn stop_session(&mut self) -> Result<SessionReport, SessionError> {
        let mut session = self.session.take().ok_or(SessionError::NotActive)?;
        self.feedback.cancel_pending();
        let report = session.stop(self.wall.now_ms())?;

        if report.mode == SessionMode::Calibration {
            self.apply_calibration(&report);
        } else {
            self.notify(Notification::info(
                NotificationCategory::Session,
                format!("Session finished: {} notes recorded", report.notes.len()),
            ));
        }
        Ok(report)
    }

    fn apply_calibration(&mut self, report: &SessionReport) {
        match report.calibration {
            Some(Ok(latency_ms)) => {
                self.settings.latency_compensation_ms = latency_ms;
                self.notify(Notification::info(
                    NotificationCategory::Calibration,
                    format!("Latency compensation set to {} ms", latency_ms),
                ));

                let saved = self.store.as_ref().map(|store| store.save(&self.settings));
                if let Some(Err(e)) = saved {
                    self.notify(Notification::warning(
                        NotificationCategory::Calibration,
                        format!("Calibration not saved: {}", e),
                    ));
                }
            }
            Some(Err(e)) => {
                self.notify(Notification::error(
                    NotificationCategory::Calibration,
                    e.to_string(),
                ));
            }
            None => {}
        }
    }

    fn notify(&self, notification: Notification) {
        let Some(notifications) = &self.notifications else {
            return;
        };
        match notifications.try_lock() {
            Ok(mut tx) => {
                if tx.try_push(notification).is_err() {
                    log::warn!("Notification buffer full, message dropped");
                }
            }
            Err(_) => log::warn!("Notification channel busy, message dropped"),
        }
    }
}
