use serde::{Deserialize, Serialize};

/// A named, bounded effect parameter.
///
/// The value is not clamped here; whoever consumes it applies the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f32, min: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            value,
            min,
            max,
        }
    }

    #[inline]
    pub fn clamped(&self) -> f32 {
        self.value.clamp(self.min, self.max)
    }

    /// Nudges the value by `fraction` of the parameter's range, staying in bounds.
    pub fn step(&mut self, fraction: f32) {
        let range = self.max - self.min;
        self.value = (self.value + range * fraction).clamp(self.min, self.max);
    }
}

/// Parameter set of one effect instance. Order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    pub name: String,
    pub is_plugin_effect: bool,
    pub parameters: Vec<Parameter>,
}

impl EffectSettings {
    pub fn new(name: impl Into<String>, is_plugin_effect: bool) -> Self {
        Self {
            name: name.into(),
            is_plugin_effect,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Value by name, falling back to `default` when missing.
    pub fn value_or(&self, name: &str, default: f32) -> f32 {
        self.parameter(name).map(Parameter::clamped).unwrap_or(default)
    }

    pub fn set_value(&mut self, index: usize, value: f32) -> bool {
        match self.parameters.get_mut(index) {
            Some(parameter) => {
                parameter.value = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_lookup_and_clamp() {
        let mut settings = EffectSettings::new("Low Pass", false)
            .with_parameter(Parameter::new("Corner", 1000.0, 10.0, 20000.0))
            .with_parameter(Parameter::new("Q", 50.0, 0.1, 10.0));

        assert_eq!(settings.index_of("Q"), Some(1));
        assert_eq!(settings.value_or("Q", 0.7), 10.0);
        assert_eq!(settings.value_or("Missing", 0.7), 0.7);

        assert!(settings.set_value(0, 440.0));
        assert!(!settings.set_value(5, 1.0));
        assert_eq!(settings.parameter("Corner").map(|p| p.value), Some(440.0));
    }

    #[test]
    fn test_step_stays_in_range() {
        let mut p = Parameter::new("Gain", 0.9, 0.0, 1.0);
        p.step(0.25);
        assert_eq!(p.value, 1.0);
        p.step(-2.0);
        assert_eq!(p.value, 0.0);
    }
}
