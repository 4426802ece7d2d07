use tsynth_core::{EffectSettings, Parameter, PlaybackFrame};

use crate::rt_processing::effects::{Effect, EffectCore};

/// Boundary for third-party effect units.
///
/// Units expose normalised `[0, 1]` parameters and process one stereo
/// sample per call. Nothing here may allocate once the sample rate is set.
pub trait PluginUnit: Send {
    fn parameter_count(&self) -> usize;

    /// Raw display name, possibly padded or decorated.
    fn parameter_name(&self, index: usize) -> String;

    fn parameter_value(&self, index: usize) -> f32;

    fn set_parameter(&mut self, index: usize, value: f32);

    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Processes a single stereo sample in place of the input.
    fn process_replacing(&mut self, input: [f32; 2]) -> [f32; 2];

    fn reset(&mut self) {}
}

/// Cuts a unit's parameter name at its first non-alphanumeric character.
pub fn sanitize_parameter_name(raw: &str) -> String {
    raw.chars().take_while(|c| c.is_ascii_alphanumeric()).collect()
}

/// Exposes a [`PluginUnit`] as a chain [`Effect`].
///
/// Parameter writes go to both the synth-side settings and the unit.
pub struct PluginAdapter {
    core: EffectCore,
    unit: Box<dyn PluginUnit>,
}

impl PluginAdapter {
    pub fn new(name: &str, mut unit: Box<dyn PluginUnit>, sample_rate: f32) -> Self {
        unit.set_sample_rate(sample_rate);

        let settings = (0..unit.parameter_count()).fold(EffectSettings::new(name, true), |settings, index| {
            let name = sanitize_parameter_name(&unit.parameter_name(index));
            settings.with_parameter(Parameter::new(name, unit.parameter_value(index), 0.0, 1.0))
        });

        let mut core = EffectCore::new(settings);
        core.initialize(sample_rate);
        Self { core, unit }
    }
}

impl Effect for PluginAdapter {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn initialize(&mut self, sample_rate: f32) {
        self.core.initialize(sample_rate);
        self.unit.set_sample_rate(sample_rate);
    }

    #[inline]
    fn apply_to_frame(&mut self, frame: &mut PlaybackFrame, _t: f64) {
        let [left, right] = self.unit.process_replacing([frame.left, frame.right]);
        frame.set(left, right);
    }

    fn has_output(&self, _t: f64) -> bool {
        true
    }

    fn clear(&mut self) {
        self.unit.reset();
    }

    fn parameters_changed(&mut self) {
        for index in 0..self.core.settings.parameters.len() {
            let value = self.core.value(index);
            if self.unit.parameter_value(index) != value {
                self.unit.set_parameter(index, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Attenuator {
        level: f32,
        rate: f32,
    }

    impl PluginUnit for Attenuator {
        fn parameter_count(&self) -> usize {
            1
        }

        fn parameter_name(&self, _index: usize) -> String {
            "Level\0\0garbage".to_string()
        }

        fn parameter_value(&self, _index: usize) -> f32 {
            self.level
        }

        fn set_parameter(&mut self, _index: usize, value: f32) {
            self.level = value;
        }

        fn set_sample_rate(&mut self, sample_rate: f32) {
            self.rate = sample_rate;
        }

        fn process_replacing(&mut self, input: [f32; 2]) -> [f32; 2] {
            [input[0] * self.level, input[1] * self.level]
        }
    }

    #[test]
    fn test_names_stop_at_first_symbol() {
        assert_eq!(sanitize_parameter_name("Cutoff"), "Cutoff");
        assert_eq!(sanitize_parameter_name("Room Size"), "Room");
        assert_eq!(sanitize_parameter_name("Dry/Wet"), "Dry");
        assert_eq!(sanitize_parameter_name("\0"), "");
    }

    #[test]
    fn test_adapter_mirrors_unit_parameters() {
        let adapter = PluginAdapter::new("Attenuator", Box::new(Attenuator { level: 0.5, rate: 0.0 }), 48_000.0);
        let settings = adapter.settings();
        assert!(settings.is_plugin_effect);
        assert_eq!(settings.parameters.len(), 1);
        assert_eq!(settings.parameters[0].name, "Level");
        assert_eq!(settings.parameters[0].value, 0.5);
        assert_eq!(adapter.core().sample_rate, 48_000.0);
    }

    #[test]
    fn test_parameter_writes_reach_the_unit() {
        let mut adapter = PluginAdapter::new("Attenuator", Box::new(Attenuator { level: 1.0, rate: 0.0 }), 48_000.0);
        adapter.update_parameter(0, 0.25);

        let mut frame = PlaybackFrame::new(1.0, -1.0);
        adapter.apply_to_frame(&mut frame, 0.0);
        assert_eq!(frame, PlaybackFrame::new(0.25, -0.25));
        assert!(adapter.has_output(0.0));
    }
}
