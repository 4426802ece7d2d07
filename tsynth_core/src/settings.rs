use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chain::SignalChainSettings;
use crate::config::SynthConfig;
use crate::error::Result;
use crate::oscillator::OscillatorParameters;
use crate::parameter::EffectSettings;

/// Live configuration shared by the render and control threads.
///
/// Setters mark the settings dirty when a value actually changes. The render
/// side pushes dirty settings into the synth and clears the flag.
///
/// The oscillator template sits behind an `Arc` built on the control side, so
/// the render side only clones the handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthSettings {
    oscillator: Arc<OscillatorParameters>,
    signal_chain: SignalChainSettings,
    output_gain: f32,
    output_balance: f32,
    key_map: BTreeMap<char, u8>,
    midi_low: u8,
    midi_high: u8,
    dirty: bool,
}

impl SynthSettings {
    pub fn new(registry: Vec<EffectSettings>) -> Self {
        Self::from_parts(&SynthConfig::default(), SignalChainSettings::new(registry))
    }

    /// Builds settings from a validated config and the effect registry.
    pub fn from_config(config: &SynthConfig, registry: Vec<EffectSettings>) -> Result<Self> {
        let mut signal_chain = SignalChainSettings::new(registry);
        signal_chain.set_chain(&config.effects)?;
        Ok(Self::from_parts(config, signal_chain))
    }

    fn from_parts(config: &SynthConfig, signal_chain: SignalChainSettings) -> Self {
        Self {
            oscillator: Arc::new(config.oscillator.clone()),
            signal_chain,
            output_gain: config.output_gain,
            output_balance: config.output_balance,
            key_map: config.key_map.clone(),
            midi_low: config.midi_low,
            midi_high: config.midi_high,
            // first hand-off pushes the initial chain
            dirty: true,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn oscillator(&self) -> &OscillatorParameters {
        &self.oscillator
    }

    pub fn set_oscillator(&mut self, value: &OscillatorParameters) {
        if *self.oscillator != *value {
            self.oscillator = Arc::new(value.clone());
            self.dirty = true;
        }
    }

    pub fn shared_oscillator(&self) -> &Arc<OscillatorParameters> {
        &self.oscillator
    }

    /// Swaps in a prepared template and hands back the previous one.
    pub fn replace_oscillator(&mut self, value: Arc<OscillatorParameters>) -> Arc<OscillatorParameters> {
        if !Arc::ptr_eq(&self.oscillator, &value) {
            self.dirty = true;
        }
        std::mem::replace(&mut self.oscillator, value)
    }

    pub fn signal_chain(&self) -> &SignalChainSettings {
        &self.signal_chain
    }

    /// Replaces the active chain.
    pub fn set_signal_chain(&mut self, value: &SignalChainSettings) {
        if self.signal_chain != *value {
            self.signal_chain.clone_from(value);
            self.dirty = true;
        }
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    pub fn set_output_gain(&mut self, value: f32) {
        if self.output_gain != value {
            self.output_gain = value;
            self.dirty = true;
        }
    }

    pub fn output_balance(&self) -> f32 {
        self.output_balance
    }

    pub fn set_output_balance(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if self.output_balance != value {
            self.output_balance = value;
            self.dirty = true;
        }
    }

    /// Lowest playable note. The range is fixed by the config the wave-table
    /// cache was built from.
    pub fn midi_low(&self) -> u8 {
        self.midi_low
    }

    pub fn midi_high(&self) -> u8 {
        self.midi_high
    }

    pub fn midi_note(&self, key: char) -> Option<u8> {
        self.key_map.get(&key).copied()
    }

    pub fn key_for(&self, midi_number: u8) -> Option<char> {
        self.key_map.iter().find(|(_, n)| **n == midi_number).map(|(k, _)| *k)
    }

    /// Key mapping is read by the control thread only and does not dirty the settings.
    pub fn set_midi_note(&mut self, key: char, midi_number: u8) {
        self.key_map.insert(key, midi_number);
    }

    pub fn key_map(&self) -> &BTreeMap<char, u8> {
        &self.key_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::BuiltinShape;
    use crate::parameter::Parameter;

    fn registry() -> Vec<EffectSettings> {
        vec![
            EffectSettings::new("Low Pass", false).with_parameter(Parameter::new("Q", 0.7, 0.1, 10.0)),
            EffectSettings::new("Reverb", true),
        ]
    }

    #[test]
    fn test_setters_mark_dirty_only_on_change() {
        let mut settings = SynthSettings::new(registry());
        assert!(settings.is_dirty());
        settings.clear_dirty();

        settings.set_output_gain(1.0);
        assert!(!settings.is_dirty());
        settings.set_output_gain(0.5);
        assert!(settings.is_dirty());
        settings.clear_dirty();

        settings.set_oscillator(&OscillatorParameters::builtin(BuiltinShape::Triangle));
        assert!(settings.is_dirty());
        settings.clear_dirty();

        settings.set_midi_note('z', 100);
        assert!(!settings.is_dirty());
        assert_eq!(settings.midi_note('z'), Some(100));
        assert_eq!(settings.key_for(100), Some('z'));
    }

    #[test]
    fn test_from_config_builds_chain() {
        let config = SynthConfig {
            effects: vec!["Reverb".into(), "Low Pass".into()],
            output_balance: 0.25,
            ..SynthConfig::default()
        };
        let settings = SynthSettings::from_config(&config, registry()).unwrap();
        assert_eq!(settings.signal_chain().len(), 2);
        assert_eq!(settings.signal_chain().get(0).map(|s| s.name.as_str()), Some("Reverb"));
        assert_eq!(settings.output_balance(), 0.25);

        let bad = SynthConfig {
            effects: vec!["Phaser".into()],
            ..SynthConfig::default()
        };
        assert!(SynthSettings::from_config(&bad, registry()).is_err());
    }

    #[test]
    fn test_replacing_the_template_swaps_the_handle() {
        let mut settings = SynthSettings::new(registry());
        settings.clear_dirty();

        let same = Arc::clone(settings.shared_oscillator());
        settings.replace_oscillator(Arc::clone(&same));
        assert!(!settings.is_dirty());

        let saw = Arc::new(OscillatorParameters::builtin(BuiltinShape::Sawtooth));
        let previous = settings.replace_oscillator(Arc::clone(&saw));
        assert!(Arc::ptr_eq(&previous, &same));
        assert!(Arc::ptr_eq(settings.shared_oscillator(), &saw));
        assert!(settings.is_dirty());

        // an equal value keeps the current handle
        settings.clear_dirty();
        settings.set_oscillator(&OscillatorParameters::builtin(BuiltinShape::Sawtooth));
        assert!(Arc::ptr_eq(settings.shared_oscillator(), &saw));
        assert!(!settings.is_dirty());
    }

    #[test]
    fn test_balance_is_clamped() {
        let mut settings = SynthSettings::new(registry());
        settings.set_output_balance(1.5);
        assert_eq!(settings.output_balance(), 1.0);
    }
}
