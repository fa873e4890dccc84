// Commands - input flowing into the session loop, feedback flowing to the audio callback

use crate::midi::normalizer::RawInput;
use crate::sequencer::metronome::PendingClick;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Raw device input, already stamped with the session clock
    Input(RawInput),
    /// End the session early (same path as the deferred stop)
    Stop,
}

/// Session → audio callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMessage {
    Click(PendingClick),
    NoteOn { pitch: i32, velocity: u8 },
    NoteOff { pitch: i32 },
    /// Drop clicks that have not sounded yet
    CancelClicks,
}
