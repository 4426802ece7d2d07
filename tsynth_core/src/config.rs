//! File-backed engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::midi::{MIDI_MAX, MIDI_PIANO_HIGH, MIDI_PIANO_LOW};
use crate::oscillator::OscillatorParameters;

/// Output balance law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PanLaw {
    /// `(1 - b, b)`.
    #[default]
    Linear,
    /// `(cos θ, sin θ)` with `θ = b·π/2`.
    EqualPower,
}

/// How a voice addresses its wave table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableReadout {
    /// Per-voice phase accumulator, continuous across the wrap.
    #[default]
    Phase,
    /// `floor(t · rate) mod len` on the stream clock.
    AbsoluteTime,
}

/// Control-thread cadence, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTiming {
    pub poll_ms: u64,
    pub handoff_ms: u64,
}

impl Default for ControlTiming {
    fn default() -> Self {
        Self {
            poll_ms: 10,
            handoff_ms: 75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: f32,
    pub buffer_frames: usize,
    pub polyphony: usize,
    pub midi_low: u8,
    pub midi_high: u8,
    pub oversample: usize,
    pub readout: TableReadout,
    pub pan_law: PanLaw,
    /// Note at which a sample plays at its recorded pitch.
    pub sample_root_note: u8,
    pub sound_bank_dir: Option<PathBuf>,
    pub output_gain: f32,
    pub output_balance: f32,
    pub key_map: BTreeMap<char, u8>,
    pub control: ControlTiming,
    pub note_queue_capacity: usize,
    pub oscillator: OscillatorParameters,
    /// Registry names placed in the post-processing chain at startup.
    pub effects: Vec<String>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            buffer_frames: 512,
            polyphony: 10,
            midi_low: MIDI_PIANO_LOW,
            midi_high: MIDI_PIANO_HIGH,
            oversample: 4,
            readout: TableReadout::default(),
            pan_law: PanLaw::default(),
            sample_root_note: 60,
            sound_bank_dir: None,
            output_gain: 1.0,
            output_balance: 0.5,
            key_map: default_key_map(),
            control: ControlTiming::default(),
            note_queue_capacity: 256,
            oscillator: OscillatorParameters::default(),
            effects: Vec::new(),
        }
    }
}

impl SynthConfig {
    /// Reads a JSON config and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: SynthConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SynthError::Configuration(msg));

        if !(self.sample_rate > 0.0) {
            return fail(format!("sample rate must be positive, got {}", self.sample_rate));
        }
        if self.buffer_frames == 0 {
            return fail("buffer_frames must be at least 1".into());
        }
        if self.polyphony == 0 {
            return fail("polyphony must be at least 1".into());
        }
        if self.midi_high > MIDI_MAX || self.sample_root_note > MIDI_MAX {
            return fail(format!("midi numbers must be at most {MIDI_MAX}"));
        }
        if self.midi_low > self.midi_high {
            return fail(format!("midi range {}..={} is inverted", self.midi_low, self.midi_high));
        }
        if self.oversample < 2 {
            return fail(format!("oversample must be at least 2, got {}", self.oversample));
        }
        if self.note_queue_capacity == 0 {
            return fail("note_queue_capacity must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.output_balance) {
            return fail(format!("output_balance {} is outside [0, 1]", self.output_balance));
        }
        if self.oscillator.signal_low >= self.oscillator.signal_high {
            return fail("oscillator signal_low must be below signal_high".into());
        }
        if let Some((key, note)) = self
            .key_map
            .iter()
            .find(|(_, note)| !(self.midi_low..=self.midi_high).contains(*note))
        {
            return fail(format!(
                "key '{key}' maps to midi {note}, outside {}..={}",
                self.midi_low, self.midi_high
            ));
        }
        Ok(())
    }
}

/// Four rows of a computer keyboard laid out as a chromatic piano.
pub fn default_key_map() -> BTreeMap<char, u8> {
    const ROWS: [(&str, u8); 4] = [
        ("zxcvbnm,./", 21),
        ("asdfghjkl;'", 33),
        ("qwertyuiop[]", 44),
        ("1234567890-=", 56),
    ];

    let mut map = BTreeMap::new();
    for (keys, first_note) in ROWS {
        for (offset, key) in keys.chars().enumerate() {
            map.insert(key, first_note + offset as u8);
        }
    }
    map
}
