//! Everything that runs on the audio thread.

pub mod accumulator;
pub mod callback;
pub mod effects;
pub mod filters;
pub mod performance;
pub mod routing;
pub mod synth;
pub mod voice_renderer;
pub mod waveform;
