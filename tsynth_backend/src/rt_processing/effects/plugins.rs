//! Bundled plugin units built from `fundsp` graphs.
//!
//! Graphs are assembled once and boxed as `AudioUnit`s. Parameters that the
//! graph cannot take at run time are applied around it, so a parameter write
//! never rebuilds anything.

use fundsp::prelude::{AudioUnit, Shared, chorus, moog, pass, reverb_stereo, shared, var};

use crate::rt_processing::effects::plugin::PluginUnit;

const MIX: usize = 0;

#[inline]
fn blend(dry: [f32; 2], wet: [f32; 2], mix: f32) -> [f32; 2] {
    [
        dry[0] + mix * (wet[0] - dry[0]),
        dry[1] + mix * (wet[1] - dry[1]),
    ]
}

/// Stereo hall reverb with a dry/wet control.
pub struct Reverb {
    unit: Box<dyn AudioUnit>,
    mix: f32,
}

impl Reverb {
    pub fn new() -> Self {
        Self {
            unit: Box::new(reverb_stereo(20.0, 2.5, 0.5)),
            mix: 0.3,
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginUnit for Reverb {
    fn parameter_count(&self) -> usize {
        1
    }

    fn parameter_name(&self, _index: usize) -> String {
        "Mix (dry/wet)".to_string()
    }

    fn parameter_value(&self, _index: usize) -> f32 {
        self.mix
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == MIX {
            self.mix = value.clamp(0.0, 1.0);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.unit.set_sample_rate(sample_rate as f64);
    }

    #[inline]
    fn process_replacing(&mut self, input: [f32; 2]) -> [f32; 2] {
        let mut wet = [0.0; 2];
        self.unit.tick(&input, &mut wet);
        blend(input, wet, self.mix)
    }

    fn reset(&mut self) {
        self.unit.reset();
    }
}

/// Five-voice chorus, one independently seeded unit per channel.
pub struct Chorus {
    left: Box<dyn AudioUnit>,
    right: Box<dyn AudioUnit>,
    mix: f32,
}

impl Chorus {
    pub fn new() -> Self {
        Self {
            left: Box::new(chorus(1, 0.015, 0.005, 0.2)),
            right: Box::new(chorus(2, 0.015, 0.005, 0.2)),
            mix: 0.5,
        }
    }
}

impl Default for Chorus {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginUnit for Chorus {
    fn parameter_count(&self) -> usize {
        1
    }

    fn parameter_name(&self, _index: usize) -> String {
        "Mix".to_string()
    }

    fn parameter_value(&self, _index: usize) -> f32 {
        self.mix
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == MIX {
            self.mix = value.clamp(0.0, 1.0);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.left.set_sample_rate(sample_rate as f64);
        self.right.set_sample_rate(sample_rate as f64);
    }

    #[inline]
    fn process_replacing(&mut self, input: [f32; 2]) -> [f32; 2] {
        let mut wet = [0.0; 2];
        self.left.tick(&input[..1], &mut wet[..1]);
        self.right.tick(&input[1..], &mut wet[1..]);
        blend(input, wet, self.mix)
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

const CUTOFF: usize = 0;
const RESONANCE: usize = 1;
const MIN_CUTOFF_HZ: f32 = 20.0;
const MAX_CUTOFF_HZ: f32 = 20_000.0;

/// Four-pole Moog ladder low-pass.
///
/// Cutoff is normalised on a log scale between 20 Hz and 20 kHz. Both channel
/// graphs read the same shared cutoff and resonance.
pub struct MoogLadder {
    left: Box<dyn AudioUnit>,
    right: Box<dyn AudioUnit>,
    cutoff: Shared,
    resonance: Shared,
    values: [f32; 2],
}

impl MoogLadder {
    pub fn new() -> Self {
        let values = [0.6, 0.2];
        let cutoff = shared(Self::cutoff_hz(values[CUTOFF]));
        let resonance = shared(Self::q(values[RESONANCE]));

        let left = Box::new((pass() | var(&cutoff) | var(&resonance)) >> moog::<f32>());
        let right = Box::new((pass() | var(&cutoff) | var(&resonance)) >> moog::<f32>());

        Self {
            left,
            right,
            cutoff,
            resonance,
            values,
        }
    }

    pub fn cutoff_hz(normalised: f32) -> f32 {
        MIN_CUTOFF_HZ * (MAX_CUTOFF_HZ / MIN_CUTOFF_HZ).powf(normalised.clamp(0.0, 1.0))
    }

    fn q(normalised: f32) -> f32 {
        normalised.clamp(0.0, 1.0) * 0.95
    }
}

impl Default for MoogLadder {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginUnit for MoogLadder {
    fn parameter_count(&self) -> usize {
        2
    }

    fn parameter_name(&self, index: usize) -> String {
        match index {
            CUTOFF => "Cutoff".to_string(),
            _ => "Resonance".to_string(),
        }
    }

    fn parameter_value(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        let value = value.clamp(0.0, 1.0);
        match index {
            CUTOFF => self.cutoff.set_value(Self::cutoff_hz(value)),
            RESONANCE => self.resonance.set_value(Self::q(value)),
            _ => return,
        }
        self.values[index] = value;
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.left.set_sample_rate(sample_rate as f64);
        self.right.set_sample_rate(sample_rate as f64);
    }

    #[inline]
    fn process_replacing(&mut self, input: [f32; 2]) -> [f32; 2] {
        let mut output = [0.0; 2];
        self.left.tick(&input[..1], &mut output[..1]);
        self.right.tick(&input[1..], &mut output[1..]);
        output
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_mix_passes_input_through() {
        let mut reverb = Reverb::new();
        reverb.set_sample_rate(44_100.0);
        reverb.set_parameter(MIX, 0.0);
        for i in 0..64 {
            let x = (i as f32 * 0.1).sin() * 0.5;
            assert_eq!(reverb.process_replacing([x, -x]), [x, -x]);
        }
    }

    #[test]
    fn test_cutoff_mapping_spans_audio_band() {
        assert!((MoogLadder::cutoff_hz(0.0) - 20.0).abs() < 1e-3);
        assert!((MoogLadder::cutoff_hz(1.0) - 20_000.0).abs() < 1.0);
        assert!(MoogLadder::cutoff_hz(0.5) > 500.0 && MoogLadder::cutoff_hz(0.5) < 800.0);
    }

    #[test]
    fn test_units_stay_finite() {
        let mut units: Vec<Box<dyn PluginUnit>> =
            vec![Box::new(Reverb::new()), Box::new(Chorus::new()), Box::new(MoogLadder::new())];
        for unit in units.iter_mut() {
            unit.set_sample_rate(44_100.0);
            for i in 0..2_000 {
                let x = if i % 100 < 50 { 0.5 } else { -0.5 };
                let [l, r] = unit.process_replacing([x, x]);
                assert!(l.is_finite() && r.is_finite());
            }
        }
    }

    #[test]
    fn test_moog_parameters_round_trip_normalised() {
        let mut moog = MoogLadder::new();
        moog.set_parameter(CUTOFF, 0.25);
        moog.set_parameter(RESONANCE, 2.0);
        assert_eq!(moog.parameter_value(CUTOFF), 0.25);
        assert_eq!(moog.parameter_value(RESONANCE), 1.0);
        assert_eq!(moog.parameter_count(), 2);
    }
}
