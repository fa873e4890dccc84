// MIDI - device input, message parsing and normalization

pub mod event;
pub mod input;
pub mod normalizer;
