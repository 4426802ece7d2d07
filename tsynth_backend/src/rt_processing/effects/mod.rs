//! Post-processing effects.
//!
//! Everything that can sit in the signal chain implements [`Effect`]:
//! the built-in filters as well as adapted plugin units. Instances are
//! owned by the [`EffectRegistry`] and referenced by index from the
//! [`SignalChain`].

pub mod chain;
pub mod plugin;
pub mod plugins;
pub mod registry;

pub use chain::SignalChain;
pub use plugin::{PluginAdapter, PluginUnit};
pub use registry::EffectRegistry;

use tsynth_core::midi::SIGNAL_HIGH;
use tsynth_core::{EffectSettings, PlaybackFrame};

use crate::rt_processing::accumulator::Accumulator;

/// Capability set shared by every chain entry.
///
/// `apply_to_frame` runs on the render thread and must not allocate,
/// block or log.
pub trait Effect: Send {
    fn core(&self) -> &EffectCore;
    fn core_mut(&mut self) -> &mut EffectCore;

    /// Prepares the effect for a sample rate. Called off the render path.
    fn initialize(&mut self, sample_rate: f32);

    fn apply_to_frame(&mut self, frame: &mut PlaybackFrame, t: f64);

    /// Advisory: false when the effect is known to be an identity right now.
    fn has_output(&self, t: f64) -> bool;

    /// Zeroes internal history without touching parameters.
    fn clear(&mut self);

    /// Hook run after a parameter value changed.
    fn parameters_changed(&mut self) {}

    fn name(&self) -> &str {
        &self.core().settings.name
    }

    fn settings(&self) -> &EffectSettings {
        &self.core().settings
    }

    fn is_clipping(&self) -> bool {
        self.core().meter.is_clipping()
    }

    fn update_parameter(&mut self, index: usize, value: f32) {
        if self.core_mut().settings.set_value(index, value) {
            self.parameters_changed();
        }
    }

    /// Pushes every changed parameter value from `settings`.
    fn update(&mut self, settings: &EffectSettings) {
        let mut changed = false;
        for (index, parameter) in settings.parameters.iter().enumerate() {
            let current = self.core().settings.parameters.get(index).map(|p| p.value);
            if current.is_some_and(|value| value != parameter.value) {
                self.core_mut().settings.set_value(index, parameter.value);
                changed = true;
            }
        }
        if changed {
            self.parameters_changed();
        }
    }
}

/// State every effect carries: its parameters, the rate it runs at and an output meter.
#[derive(Debug, Clone)]
pub struct EffectCore {
    pub settings: EffectSettings,
    pub sample_rate: f32,
    pub meter: ClipMeter,
}

impl EffectCore {
    pub fn new(settings: EffectSettings) -> Self {
        Self {
            settings,
            sample_rate: 0.0,
            meter: ClipMeter::new(1),
        }
    }

    /// Resets the meter window to one second at the new rate.
    pub fn initialize(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.meter = ClipMeter::new(sample_rate as u32);
    }

    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.settings.parameters.get(index).map(|p| p.clamped()).unwrap_or(0.0)
    }
}

/// Windowed mean of |x| per channel, compared against the signal bound.
#[derive(Debug, Clone)]
pub struct ClipMeter {
    left: Accumulator,
    right: Accumulator,
}

impl ClipMeter {
    pub fn new(window: u32) -> Self {
        Self {
            left: Accumulator::windowed(true, window),
            right: Accumulator::windowed(true, window),
        }
    }

    #[inline]
    pub fn observe(&mut self, frame: &PlaybackFrame) {
        self.left.add(frame.left);
        self.right.add(frame.right);
    }

    pub fn is_clipping(&self) -> bool {
        self.left.average() > SIGNAL_HIGH || self.right.average() > SIGNAL_HIGH
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tsynth_core::Parameter;

    /// Adds a constant to both channels. Makes chain order observable.
    pub struct Offset {
        core: EffectCore,
    }

    impl Offset {
        pub fn new(name: &str, amount: f32) -> Self {
            let settings = EffectSettings::new(name, false).with_parameter(Parameter::new("Amount", amount, -10.0, 10.0));
            Self {
                core: EffectCore::new(settings),
            }
        }
    }

    impl Effect for Offset {
        fn core(&self) -> &EffectCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut EffectCore {
            &mut self.core
        }

        fn initialize(&mut self, sample_rate: f32) {
            self.core.initialize(sample_rate);
        }

        fn apply_to_frame(&mut self, frame: &mut PlaybackFrame, _t: f64) {
            let amount = self.core.value(0);
            frame.left += amount;
            frame.right += amount;
        }

        fn has_output(&self, _t: f64) -> bool {
            self.core.value(0) != 0.0
        }

        fn clear(&mut self) {}
    }
}
