// Audio - CPAL output, audio clock and click/monitor feedback

pub mod dsp_utils;
pub mod engine;
pub mod feedback;
pub mod format_conversion;
pub mod monitor;
pub mod parameters;
pub mod timing;
