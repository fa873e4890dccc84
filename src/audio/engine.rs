// Audio engine - CPAL output stream for the metronome and the monitor tone
//
// # Format Support
//
// The device's preferred sample format is detected via `sample_format()` and a
// matching stream is built (F32, I16 or U16). Rendering is f32 throughout and
// converted when the frame is written.
//
// # Timing
//
// The callback advances `AudioTiming` by the number of frames it rendered. That
// counter is the audio clock the beat scheduler polls, so a click scheduled for
// sample N sounds exactly at N regardless of buffer size.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};

use crate::audio::dsp_utils::{flush_denormals_to_zero, soft_clip};
use crate::audio::format_conversion::{write_mono_to_interleaved_frame, write_silence};
use crate::audio::monitor::MonitorVoice;
use crate::audio::parameters::AtomicF32;
use crate::audio::timing::AudioTiming;
use crate::messaging::channels::{AudioConsumer, NotificationProducer};
use crate::messaging::command::AudioMessage;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::metronome::Metronome;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}. Supported formats: F32, I16, U16")]
    UnsupportedFormat(String),

    #[error("Audio stream error: {0}")]
    Stream(String),
}

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: f32,
    pub volume: AtomicF32,
    pub timing: AudioTiming,
}

impl AudioEngine {
    pub fn new(
        audio_rx: AudioConsumer,
        notification_tx: Arc<Mutex<NotificationProducer>>,
        metronome_volume: f32,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        log::debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let volume = AtomicF32::new(metronome_volume.clamp(0.0, 1.0));
        let timing = AudioTiming::new(sample_rate);

        let render = Renderer {
            audio_rx,
            metronome: Metronome::new(sample_rate),
            monitor: MonitorVoice::new(sample_rate),
            volume: volume.clone(),
            timing: timing.clone(),
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                render,
                notification_tx.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                render,
                notification_tx.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                render,
                notification_tx.clone(),
            ),
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        timing.set_running(true);

        log::info!("Audio engine started: {} Hz, {} channels", sample_rate, channels);

        if let Ok(mut tx) = notification_tx.try_lock() {
            let notif = Notification::info(
                NotificationCategory::Audio,
                format!("Audio connected: {} Hz", sample_rate),
            );
            let _ = tx.try_push(notif);
        }

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            volume,
            timing,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Audio clock handle for the scheduler and the feedback sink
    pub fn timing(&self) -> AudioTiming {
        self.timing.clone()
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut render: Renderer,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let error_timing = render.timing.clone();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // ========== SACRED ZONE ==========
                    // No allocations, No I/O, No blocking locks
                    render.process(data, channels);
                    // ========== SACRED ZONE END ==========
                },
                move |err| {
                    // Outside the audio callback: I/O is fine here
                    eprintln!("Audio stream error: {}", err);

                    // The scheduler sees a missing clock and aborts the session
                    error_timing.set_running(false);

                    if let Ok(mut tx) = notification_tx.try_lock() {
                        let notif = Notification::error(
                            NotificationCategory::Audio,
                            format!("Audio stream error: {}", err),
                        );
                        let _ = tx.try_push(notif);
                    }
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }
}

/// Callback-side state, owned by the stream closure
struct Renderer {
    audio_rx: AudioConsumer,
    metronome: Metronome,
    monitor: MonitorVoice,
    volume: AtomicF32,
    timing: AudioTiming,
}

impl Renderer {
    fn process<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        if channels == 0 {
            write_silence(data);
            return;
        }

        while let Some(message) = self.audio_rx.try_pop() {
            match message {
                AudioMessage::Click(click) => self.metronome.schedule_click(click),
                AudioMessage::NoteOn { pitch, velocity } => self.monitor.note_on(pitch, velocity),
                AudioMessage::NoteOff { pitch } => self.monitor.note_off(pitch),
                AudioMessage::CancelClicks => self.metronome.reset(),
            }
        }
        self.metronome.set_volume(self.volume.get());

        let start = self.timing.current_sample();
        let mut frames = 0;
        for frame in data.chunks_mut(channels) {
            let click = self.metronome.process_sample(start + frames as u64);
            let sample = soft_clip(flush_denormals_to_zero(click + self.monitor.next_sample()));
            write_mono_to_interleaved_frame(sample, frame);
            frames += 1;
        }
        self.timing.advance(frames);
    }
}
