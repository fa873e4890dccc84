// Rhythm Trainer - Library exports for tests and benchmarks

pub mod audio;
pub mod messaging;
pub mod midi;
pub mod notation;
pub mod sequencer;
pub mod session;
pub mod settings;

// Re-export commonly used types for convenience
pub use audio::engine::AudioEngine;
pub use audio::feedback::AudioFeedback;
pub use audio::timing::{AudioClock, AudioTiming, ManualClock};
pub use messaging::channels::{
    create_audio_channel, create_command_channel, create_notification_channel,
};
pub use messaging::command::SessionCommand;
pub use midi::normalizer::{EventNormalizer, NormalizedEvent, RawInput};
pub use notation::{Notation, NotationExport, NotationToken, TimingClass, TokenKind, assemble};
pub use sequencer::{
    BeatInstant, ClickType, ConfigError, GridPosition, RecordedNote, SessionConfig, Tempo,
    TimeSignature,
};
pub use session::{
    CalibrationError, FeedbackSink, Session, SessionClock, SessionError, SessionMode,
    SessionReport, SessionRunner, SilentFeedback, Trainer,
};
pub use settings::{Settings, SettingsError, SettingsStore};
