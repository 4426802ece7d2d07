use tracing::info;

use tsynth_core::{EffectSettings, Result, SynthError};

use crate::rt_processing::effects::plugins::{Chorus, MoogLadder, Reverb};
use crate::rt_processing::effects::{Effect, PluginAdapter};
use crate::rt_processing::filters::{BiQuadFilter, BiQuadType, CombFilter};

/// Owner of every effect instance for the session.
///
/// Chains refer to entries by index. Entries are never removed, so an index
/// stays valid for the registry's lifetime.
pub struct EffectRegistry {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self { effects: Vec::new() }
    }

    /// Every built-in filter plus the bundled plugin units.
    pub fn builtin(sample_rate: f32) -> Self {
        let mut registry = Self::new();

        for kind in BiQuadType::ALL {
            registry.push(Box::new(BiQuadFilter::new(kind, sample_rate)));
        }
        registry.push(Box::new(CombFilter::new("Comb Echo", 0.25, 0.5, false, sample_rate)));
        registry.push(Box::new(CombFilter::new("Comb Feedback", 0.1, 0.4, true, sample_rate)));

        registry.push(Box::new(PluginAdapter::new("Reverb", Box::new(Reverb::new()), sample_rate)));
        registry.push(Box::new(PluginAdapter::new("Chorus", Box::new(Chorus::new()), sample_rate)));
        registry.push(Box::new(PluginAdapter::new("Moog Ladder", Box::new(MoogLadder::new()), sample_rate)));

        info!(effects = registry.len(), sample_rate, "effect registry built");
        registry
    }

    fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    /// Adds an effect. Names must be unique.
    pub fn register(&mut self, effect: Box<dyn Effect>) -> Result<usize> {
        if self.index_of(effect.name()).is_some() {
            return Err(SynthError::Configuration(format!(
                "effect '{}' is already registered",
                effect.name()
            )));
        }
        self.effects.push(effect);
        Ok(self.effects.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.effects.iter().position(|e| e.name() == name)
    }

    pub fn get(&self, index: usize) -> Option<&(dyn Effect + 'static)> {
        self.effects.get(index).map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn Effect + 'static)> {
        match self.effects.get_mut(index) {
            Some(effect) => Some(effect.as_mut()),
            None => None,
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&(dyn Effect + 'static)> {
        self.index_of(name).and_then(|index| self.get(index))
    }

    /// Current settings of every entry, in registry order.
    pub fn settings(&self) -> Vec<EffectSettings> {
        self.effects.iter().map(|e| e.settings().clone()).collect()
    }

    pub fn initialize(&mut self, sample_rate: f32) {
        for effect in self.effects.iter_mut() {
            effect.initialize(sample_rate);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn Effect + 'static)> {
        self.effects.iter().map(|e| e.as_ref())
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
