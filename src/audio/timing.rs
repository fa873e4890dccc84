// Audio timing utilities - the monotonic clock the beat scheduler polls

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Monotonic audio clock, in seconds
///
/// `None` means the clock is not available (no running output stream); the
/// scheduler cannot produce a timeline without it.
pub trait AudioClock: Send + Sync {
    fn now_seconds(&self) -> Option<f64>;
}

/// Shared audio timing state, driven by the output callback
#[derive(Clone)]
pub struct AudioTiming {
    /// Current sample position (incremented by audio callback)
    sample_position: Arc<AtomicU64>,
    /// Set once the output stream is playing
    running: Arc<AtomicBool>,
    /// Sample rate (for timestamp conversions)
    sample_rate: f64,
}

impl AudioTiming {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Get current sample position
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Relaxed)
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Convert an audio-clock time to an absolute sample position
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate) as u64
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}

impl AudioClock for AudioTiming {
    fn now_seconds(&self) -> Option<f64> {
        if !self.is_running() || self.sample_rate <= 0.0 {
            return None;
        }
        Some(self.current_sample() as f64 / self.sample_rate)
    }
}

/// Hand-driven clock for deterministic replay
///
/// Stores the time as f64 bits so it can be shared with a runner thread.
#[derive(Clone, Default)]
pub struct ManualClock {
    seconds_bits: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl ManualClock {
    pub fn new(start_seconds: f64) -> Self {
        let clock = Self::default();
        clock.set(start_seconds);
        clock
    }

    /// A clock that reports itself as missing
    pub fn unavailable() -> Self {
        let clock = Self::default();
        clock.set_available(false);
        clock
    }

    /// Simulate the output stream going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    pub fn set(&self, seconds: f64) {
        self.seconds_bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        let now = f64::from_bits(self.seconds_bits.load(Ordering::Relaxed));
        self.set(now + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now_seconds(&self) -> Option<f64> {
        if self.unavailable.load(Ordering::Relaxed) {
            return None;
        }
        Some(f64::from_bits(self.seconds_bits.load(Ordering::Relaxed)))
    }
}
