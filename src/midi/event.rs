// MIDI types events

/// Note messages the trainer cares about; everything else is dropped at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl MidiEvent {
    /// Parse a raw MIDI message
    ///
    /// Only the message-type nibble is inspected (channel bits are ignored).
    /// System and real-time messages (0xF0..=0xFF: clock, active sensing,
    /// sysex, ...), non-note channel messages and truncated messages all
    /// return `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status >= 0xF0 {
            return None;
        }

        match (status & 0xF0, data) {
            // Velocity 0 = Note Off
            (0x90, [note, 0, ..]) => Some(MidiEvent::NoteOff { note: *note }),
            (0x90, [note, velocity, ..]) => Some(MidiEvent::NoteOn {
                note: *note,
                velocity: *velocity,
            }),
            (0x80, [note, _, ..]) => Some(MidiEvent::NoteOff { note: *note }),
            _ => None,
        }
    }

    pub fn note(&self) -> u8 {
        match self {
            MidiEvent::NoteOn { note, .. } | MidiEvent::NoteOff { note } => *note,
        }
    }
}
