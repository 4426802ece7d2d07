pub mod chain;
pub mod config;
pub mod error;
pub mod frame;
pub mod midi;
pub mod oscillator;
pub mod parameter;
pub mod settings;

pub use chain::SignalChainSettings;
pub use config::{ControlTiming, PanLaw, SynthConfig, TableReadout};
pub use error::{Result, SynthError};
pub use frame::PlaybackFrame;
pub use oscillator::{BuiltinShape, EnvelopeSettings, OscillatorParameters, SourceKind};
pub use parameter::{EffectSettings, Parameter};
pub use settings::SynthSettings;
