// Metronome - Click track playback
// Plays pre-generated clicks at the sample position the beat scheduler asked for

use std::collections::VecDeque;
use std::f32::consts::PI;

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on first beat of bar (accent/downbeat)
    Accent,
    /// Click on other beats
    Regular,
}

/// Metronome click sound generator
/// Pre-generates short click samples for low CPU overhead
#[derive(Debug, Clone)]
pub struct MetronomeSound {
    accent_samples: Vec<f32>,
    regular_samples: Vec<f32>,
}

impl MetronomeSound {
    /// Duration of click in milliseconds
    const CLICK_DURATION_MS: f32 = 10.0;

    /// Create new metronome sound generator
    pub fn new(sample_rate: f32) -> Self {
        let click_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;

        Self {
            accent_samples: Self::generate_click(sample_rate, click_samples, 1200.0, 0.6),
            regular_samples: Self::generate_click(sample_rate, click_samples, 800.0, 0.4),
        }
    }

    /// Generate a short click sound using sine wave with envelope
    /// Higher frequency and amplitude for accent clicks
    fn generate_click(
        sample_rate: f32,
        num_samples: usize,
        frequency: f32,
        amplitude: f32,
    ) -> Vec<f32> {
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * 8.0).exp(); // Fast decay
                (i as f32 * phase_increment).sin() * envelope * amplitude
            })
            .collect()
    }

    /// Get click samples for given type
    pub fn get_click(&self, click_type: ClickType) -> &[f32] {
        match click_type {
            ClickType::Accent => &self.accent_samples,
            ClickType::Regular => &self.regular_samples,
        }
    }
}

/// A click waiting for its sample position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingClick {
    pub at_sample: u64,
    pub click_type: ClickType,
}

/// Active click playback state
#[derive(Debug, Clone)]
struct ClickPlayback {
    click_type: ClickType,
    position: usize, // Current position in click buffer
}

/// Metronome state for playback
#[derive(Debug, Clone)]
pub struct Metronome {
    sound: MetronomeSound,
    enabled: bool,
    volume: f32,

    pending: VecDeque<PendingClick>,
    current_click: Option<ClickPlayback>,
}

impl Metronome {
    /// Clicks queued ahead of the playhead; lookahead keeps this tiny
    const PENDING_CAPACITY: usize = 64;

    /// Create new metronome
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sound: MetronomeSound::new(sample_rate),
            enabled: true,
            volume: 0.5,
            pending: VecDeque::with_capacity(Self::PENDING_CAPACITY),
            current_click: None,
        }
    }

    /// Enable/disable metronome
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set metronome volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Queue a click at an absolute sample position
    /// Clicks arrive in beat order, so the queue stays sorted
    pub fn schedule_click(&mut self, click: PendingClick) {
        if !self.enabled || self.pending.len() >= Self::PENDING_CAPACITY {
            return;
        }
        self.pending.push_back(click);
    }

    /// Process one sample of metronome output at absolute position `sample`
    /// Returns the click sample (0.0 if no click active)
    pub fn process_sample(&mut self, sample: u64) -> f32 {
        // Late clicks start immediately rather than being dropped
        if let Some(next) = self.pending.front() {
            if next.at_sample <= sample {
                self.current_click = Some(ClickPlayback {
                    click_type: next.click_type,
                    position: 0,
                });
                self.pending.pop_front();
            }
        }

        if let Some(ref mut playback) = self.current_click {
            let click_samples = self.sound.get_click(playback.click_type);

            if playback.position < click_samples.len() {
                let out = click_samples[playback.position] * self.volume;
                playback.position += 1;
                return out;
            }
            self.current_click = None;
        }

        0.0
    }

    /// Drop queued and sounding clicks (session stop)
    pub fn reset(&mut self) {
        self.pending.clear();
        self.current_click = None;
    }
}
