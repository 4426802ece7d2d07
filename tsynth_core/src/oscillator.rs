use serde::{Deserialize, Serialize};

use crate::midi::{SIGNAL_HIGH, SIGNAL_LOW, midi_frequency};

/// Where a voice gets its audio from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Builtin,
    SampleBased,
}

/// Built-in periodic waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinShape {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    PluckedString,
}

impl BuiltinShape {
    pub const ALL: [BuiltinShape; 5] = [
        BuiltinShape::Sine,
        BuiltinShape::Square,
        BuiltinShape::Triangle,
        BuiltinShape::Sawtooth,
        BuiltinShape::PluckedString,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinShape::Sine => "Sine",
            BuiltinShape::Square => "Square",
            BuiltinShape::Triangle => "Triangle",
            BuiltinShape::Sawtooth => "Sawtooth",
            BuiltinShape::PluckedString => "Plucked String",
        }
    }

    /// Next shape in display order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// ADSR template. Times in seconds, peaks as linear gain.
///
/// `sustain_s` is informational only: the sustain stage holds until release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSettings {
    pub attack_s: f32,
    pub decay_s: f32,
    pub sustain_s: f32,
    pub release_s: f32,
    pub attack_peak: f32,
    pub sustain_peak: f32,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack_s: 0.01,
            decay_s: 0.1,
            sustain_s: 1.0,
            release_s: 0.3,
            attack_peak: 1.0,
            sustain_peak: 0.7,
        }
    }
}

impl EnvelopeSettings {
    pub fn new(attack_s: f32, decay_s: f32, sustain_s: f32, release_s: f32, attack_peak: f32, sustain_peak: f32) -> Self {
        Self {
            attack_s,
            decay_s,
            sustain_s,
            release_s,
            attack_peak,
            sustain_peak,
        }
    }

    /// Short attack, no sustain. Used by the plucked string.
    pub fn percussive() -> Self {
        Self::new(0.005, 0.4, 0.0, 0.2, 1.0, 0.0)
    }
}

/// Live oscillator template. Copied into every voice at note-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParameters {
    pub source_kind: SourceKind,
    pub builtin_shape: BuiltinShape,
    pub instrument_bank: String,
    pub instrument_name: String,
    pub frequency: f32,
    pub signal_low: f32,
    pub signal_high: f32,
    pub envelope: EnvelopeSettings,
}

impl Default for OscillatorParameters {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::Builtin,
            builtin_shape: BuiltinShape::Sine,
            instrument_bank: String::new(),
            instrument_name: String::new(),
            frequency: midi_frequency(69),
            signal_low: SIGNAL_LOW,
            signal_high: SIGNAL_HIGH,
            envelope: EnvelopeSettings::default(),
        }
    }
}

impl OscillatorParameters {
    pub fn builtin(shape: BuiltinShape) -> Self {
        Self {
            builtin_shape: shape,
            ..Self::default()
        }
    }

    pub fn sample(bank: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::SampleBased,
            instrument_bank: bank.into(),
            instrument_name: name.into(),
            ..Self::default()
        }
    }

    /// Copy of this template retuned to a MIDI note.
    pub fn for_note(&self, midi_number: u8) -> Self {
        Self {
            frequency: midi_frequency(midi_number),
            ..self.clone()
        }
    }
}
