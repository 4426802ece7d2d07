use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};
use crate::parameter::EffectSettings;

/// Effect registry plus the active post-processing chain.
///
/// The registry lists every effect known for the session. The chain is an
/// ordered selection out of it; every chain entry names a registry entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalChainSettings {
    registry: Vec<EffectSettings>,
    chain: Vec<EffectSettings>,
}

impl SignalChainSettings {
    pub fn new(registry: Vec<EffectSettings>) -> Self {
        Self {
            registry,
            chain: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Appends a copy of the named registry entry to the chain. Each effect
    /// appears at most once.
    pub fn add(&mut self, name: &str) -> Result<()> {
        self.ensure_absent(name)?;
        let settings = self.registry_entry(name)?.clone();
        self.chain.push(settings);
        Ok(())
    }

    /// Appends explicit settings; the name must exist in the registry.
    pub fn add_settings(&mut self, settings: EffectSettings) -> Result<()> {
        self.ensure_absent(&settings.name)?;
        self.registry_entry(&settings.name)?;
        self.chain.push(settings);
        Ok(())
    }

    fn ensure_absent(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Err(SynthError::Configuration(format!("effect '{name}' is already in the chain")));
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.chain.iter().any(|s| s.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&EffectSettings> {
        self.chain.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut EffectSettings> {
        self.chain.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectSettings> {
        self.chain.iter()
    }

    pub fn registry(&self) -> &[EffectSettings] {
        &self.registry
    }

    pub fn registry_entry(&self, name: &str) -> Result<&EffectSettings> {
        self.registry
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SynthError::Configuration(format!("effect '{name}' is not in the registry")))
    }

    pub fn registry_names(&self) -> Vec<String> {
        self.registry.iter().map(|s| s.name.clone()).collect()
    }

    pub fn remove(&mut self, index: usize) -> Option<EffectSettings> {
        (index < self.chain.len()).then(|| self.chain.remove(index))
    }

    /// Replaces the parameters of a chain entry. Shapes must match.
    pub fn update(&mut self, index: usize, settings: &EffectSettings) -> Result<()> {
        let entry = self
            .chain
            .get_mut(index)
            .ok_or_else(|| SynthError::Configuration(format!("no chain entry at index {index}")))?;

        if entry.name != settings.name || entry.parameters.len() != settings.parameters.len() {
            return Err(SynthError::Configuration(format!(
                "settings for '{}' do not match chain entry '{}'",
                settings.name, entry.name
            )));
        }

        entry.parameters.clone_from(&settings.parameters);
        Ok(())
    }

    /// Swaps an entry with its predecessor. Returns false at the head.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.chain.len() {
            return false;
        }
        self.chain.swap(index - 1, index);
        true
    }

    pub fn clear(&mut self) {
        self.chain.clear();
    }

    /// Replaces the chain with the named registry entries, in order.
    pub fn set_chain<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut chain: Vec<EffectSettings> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if chain.iter().any(|s| s.name == name) {
                return Err(SynthError::Configuration(format!("effect '{name}' is listed twice")));
            }
            chain.push(self.registry_entry(name)?.clone());
        }
        self.chain = chain;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    fn registry() -> Vec<EffectSettings> {
        ["Low Pass", "Comb Echo", "Reverb"]
            .into_iter()
            .map(|name| EffectSettings::new(name, false).with_parameter(Parameter::new("Gain", 0.5, 0.0, 1.0)))
            .collect()
    }

    #[test]
    fn test_chain_entries_must_come_from_registry() {
        let mut settings = SignalChainSettings::new(registry());
        assert!(settings.add("Reverb").is_ok());
        assert!(settings.add("Flanger").is_err());
        assert!(settings.contains("Reverb"));
        assert!(!settings.contains("Low Pass"));
        assert_eq!(settings.len(), 1);
        assert_eq!(settings.registry_len(), 3);
    }

    #[test]
    fn test_an_effect_joins_the_chain_once() {
        let mut settings = SignalChainSettings::new(registry());
        settings.add("Reverb").unwrap();
        assert!(settings.add("Reverb").is_err());

        let copy = settings.registry_entry("Reverb").unwrap().clone();
        assert!(settings.add_settings(copy).is_err());
        assert_eq!(settings.len(), 1);

        assert!(settings.set_chain(&["Low Pass", "Reverb", "Low Pass"]).is_err());
        let names: Vec<_> = settings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Reverb"]);
    }

    #[test]
    fn test_set_chain_preserves_order() {
        let mut settings = SignalChainSettings::new(registry());
        settings.set_chain(&["Reverb", "Low Pass", "Comb Echo"]).unwrap();
        let names: Vec<_> = settings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Reverb", "Low Pass", "Comb Echo"]);

        assert!(settings.move_up(2));
        let names: Vec<_> = settings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Reverb", "Comb Echo", "Low Pass"]);

        // failed rebuild leaves the chain untouched
        assert!(settings.set_chain(&["Reverb", "Nope"]).is_err());
        assert_eq!(settings.len(), 3);
    }

    #[test]
    fn test_update_rejects_mismatched_shape() {
        let mut settings = SignalChainSettings::new(registry());
        settings.add("Low Pass").unwrap();

        let mut edited = settings.get(0).cloned().unwrap();
        edited.parameters[0].value = 0.9;
        settings.update(0, &edited).unwrap();
        assert_eq!(settings.get(0).unwrap().parameters[0].value, 0.9);

        edited.parameters.push(Parameter::new("Extra", 0.0, 0.0, 1.0));
        assert!(settings.update(0, &edited).is_err());
        assert!(settings.update(3, &edited).is_err());

        assert!(settings.remove(0).is_some());
        assert!(settings.remove(0).is_none());
    }
}
