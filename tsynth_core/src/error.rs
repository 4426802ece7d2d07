use std::path::PathBuf;

use thiserror::Error;

use crate::oscillator::BuiltinShape;

pub type Result<T> = std::result::Result<T, SynthError>;

/// Errors surfaced by the synth engine and its configuration layer.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Bad configuration or mapping. Not recoverable at runtime; report at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No pre-enumerated oscillator table exists for this note/shape.
    #[error("no wave table registered for midi note {midi_number} ({shape:?})")]
    OscillatorNotFound { midi_number: u8, shape: BuiltinShape },

    /// The table exists in principle but has not been built yet. The render
    /// thread never builds tables, so it drops the note instead.
    #[error("wave table for midi note {midi_number} has not been built")]
    TableNotBuilt { midi_number: u8 },

    /// No sample with this name was discovered in the bank.
    #[error("sample '{sample}' not found in sound bank '{bank}'")]
    SampleNotFound { bank: String, sample: String },

    /// Every voice slot is engaged. The caller decides whether to drop or steal.
    #[error("voice capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },

    /// A sample file could not be decoded. Skip it and keep loading the rest.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("synth engine used before initialization")]
    NotInitialized,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

impl SynthError {
    /// True for lookup failures that point at a configuration or range bug.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            SynthError::Configuration(_)
                | SynthError::OscillatorNotFound { .. }
                | SynthError::SampleNotFound { .. }
        )
    }
}
