// Format conversion for CPAL output streams
//
// Everything is rendered as f32; the conversion to the device's sample format
// (F32, I16, U16) happens when a frame is written, without allocation.

use cpal::{FromSample, Sample};

/// Write a mono sample to every channel of one interleaved frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(internal_sample);
    }
}

/// Fill a buffer with the format's equilibrium value
#[inline]
pub fn write_silence<T>(output: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for sample in output.iter_mut() {
        *sample = Sample::from_sample::<f32>(0.0);
    }
}
