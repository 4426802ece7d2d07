pub mod control;
pub mod engine;
pub mod rt_processing;
pub mod samples;

pub use control::{ControlSurface, ControlThread, KeyEvent, SurfaceInput, UiSnapshot};
pub use engine::Engine;
pub use rt_processing::callback::{AudioController, NoteEvent, RenderContext, RenderStatus, SharedSynth};
pub use rt_processing::effects::{Effect, EffectRegistry};
pub use rt_processing::waveform::{WaveTable, WaveTableCache};
