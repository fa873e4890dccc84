// Monitor voice - a single sine tone echoing the performer's notes
// Last-note priority: a new note-on retunes the voice, a note-off only
// releases it when it matches the sounding pitch.

use crate::audio::dsp_utils::OnePoleSmoother;
use std::f32::consts::TAU;

/// Attack/release smoothing of the monitor gain
const GAIN_SMOOTHING_MS: f32 = 5.0;
const MONITOR_LEVEL: f32 = 0.3;

/// Frequency of a MIDI-style pitch: 440 * 2^((pitch - 69) / 12)
pub fn pitch_to_frequency(pitch: i32) -> f32 {
    440.0 * 2_f32.powf((pitch as f32 - 69.0) / 12.0)
}

#[derive(Debug, Clone)]
pub struct MonitorVoice {
    sample_rate: f32,
    phase: f32,
    phase_increment: f32,
    pitch: Option<i32>,
    target_gain: f32,
    gain: OnePoleSmoother,
}

impl MonitorVoice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            phase_increment: 0.0,
            pitch: None,
            target_gain: 0.0,
            gain: OnePoleSmoother::new(0.0, GAIN_SMOOTHING_MS, sample_rate),
        }
    }

    pub fn note_on(&mut self, pitch: i32, velocity: u8) {
        self.pitch = Some(pitch);
        self.phase_increment = TAU * pitch_to_frequency(pitch) / self.sample_rate;
        self.target_gain = velocity as f32 / 127.0 * MONITOR_LEVEL;
    }

    pub fn note_off(&mut self, pitch: i32) {
        if self.pitch == Some(pitch) {
            self.pitch = None;
            self.target_gain = 0.0;
        }
    }

    pub fn sounding_pitch(&self) -> Option<i32> {
        self.pitch
    }

    pub fn next_sample(&mut self) -> f32 {
        let gain = self.gain.process(self.target_gain);
        if gain == 0.0 {
            return 0.0;
        }

        let out = self.phase.sin() * gain;
        self.phase += self.phase_increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        out
    }
}
