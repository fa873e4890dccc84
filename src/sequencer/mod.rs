// Sequencer module
// Session timeline, beat scheduling, quantization and take recording

pub mod metronome;
pub mod note;
pub mod quantizer;
pub mod recorder;
pub mod scheduler;
pub mod timeline;

pub use metronome::{ClickType, Metronome, PendingClick};
pub use note::{ActiveNoteEntry, GridPosition, RecordedNote};
pub use quantizer::{GridQuantizer, Quantized};
pub use recorder::{RecorderOutcome, TakeRecorder, resolve_duration};
pub use scheduler::{BeatInstant, BeatScheduler, SchedulerError};
pub use timeline::{ConfigError, SessionConfig, Tempo, TimeSignature};
