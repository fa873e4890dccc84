// Audio feedback - FeedbackSink that forwards clicks and monitor notes to the output callback

use crate::audio::timing::AudioTiming;
use crate::messaging::channels::AudioProducer;
use crate::messaging::command::AudioMessage;
use crate::sequencer::metronome::{ClickType, PendingClick};
use crate::session::FeedbackSink;
use ringbuf::traits::Producer;

pub struct AudioFeedback {
    tx: AudioProducer,
    timing: AudioTiming,
}

impl AudioFeedback {
    pub fn new(tx: AudioProducer, timing: AudioTiming) -> Self {
        Self { tx, timing }
    }

    fn send(&mut self, message: AudioMessage) {
        if self.tx.try_push(message).is_err() {
            log::warn!("Audio buffer full, {:?} dropped", message);
        }
    }
}

impl FeedbackSink for AudioFeedback {
    fn click(&mut self, click_type: ClickType, audio_time: f64) {
        let at_sample = self.timing.seconds_to_samples(audio_time);
        self.send(AudioMessage::Click(PendingClick {
            at_sample,
            click_type,
        }));
    }

    fn note(&mut self, pitch: i32, velocity: u8, on: bool) {
        let message = if on {
            AudioMessage::NoteOn { pitch, velocity }
        } else {
            AudioMessage::NoteOff { pitch }
        };
        self.send(message);
    }

    fn cancel_pending(&mut self) {
        self.send(AudioMessage::CancelClicks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_audio_channel;
    use ringbuf::traits::Consumer;

    #[test]
    fn test_click_converted_to_sample_position() {
        let (tx, mut rx) = create_audio_channel(8);
        let mut feedback = AudioFeedback::new(tx, AudioTiming::new(48000.0));

        feedback.click(ClickType::Accent, 0.5);
        assert_eq!(
            rx.try_pop(),
            Some(AudioMessage::Click(PendingClick {
                at_sample: 24000,
                click_type: ClickType::Accent,
            }))
        );
    }

    #[test]
    fn test_notes_and_cancel_forwarded() {
        let (tx, mut rx) = create_audio_channel(8);
        let mut feedback = AudioFeedback::new(tx, AudioTiming::new(48000.0));

        feedback.note(60, 90, true);
        feedback.note(60, 0, false);
        feedback.cancel_pending();

        assert_eq!(rx.try_pop(), Some(AudioMessage::NoteOn { pitch: 60, velocity: 90 }));
        assert_eq!(rx.try_pop(), Some(AudioMessage::NoteOff { pitch: 60 }));
        assert_eq!(rx.try_pop(), Some(AudioMessage::CancelClicks));
    }

    #[test]
    fn test_full_buffer_does_not_block() {
        let (tx, _rx) = create_audio_channel(1);
        let mut feedback = AudioFeedback::new(tx, AudioTiming::new(48000.0));

        feedback.note(60, 90, true);
        feedback.note(62, 90, true);
    }
}
