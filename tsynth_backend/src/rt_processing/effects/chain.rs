use tsynth_core::{PlaybackFrame, Result, SignalChainSettings, SynthError};

use crate::rt_processing::effects::EffectRegistry;

/// Ordered list of registry indices applied to every frame.
///
/// Storage is sized to the registry at construction, so rebuilding the chain
/// from settings never allocates.
#[derive(Debug, Clone)]
pub struct SignalChain {
    indices: Vec<usize>,
    members: Vec<bool>,
}

impl SignalChain {
    pub fn new(registry_len: usize) -> Self {
        Self {
            indices: Vec::with_capacity(registry_len),
            members: vec![false; registry_len],
        }
    }

    /// Rebuilds the active list from `settings` and pushes each entry's
    /// parameters into its effect.
    ///
    /// Every name is resolved before anything changes; on error the chain is
    /// left as it was. Effects that join the chain start with cleared history.
    pub fn update(&mut self, settings: &SignalChainSettings, registry: &mut EffectRegistry) -> Result<()> {
        for (position, entry) in settings.iter().enumerate() {
            match registry.index_of(&entry.name) {
                Some(index) if index < self.members.len() => {}
                _ => {
                    return Err(SynthError::Configuration(format!(
                        "chain entry '{}' has no registered effect",
                        entry.name
                    )));
                }
            }
            // one instance per effect, and the index list never outgrows the registry
            if settings.iter().take(position).any(|earlier| earlier.name == entry.name) {
                return Err(SynthError::Configuration(format!(
                    "chain entry '{}' appears twice",
                    entry.name
                )));
            }
        }

        for entry in settings.iter() {
            let Some(index) = registry.index_of(&entry.name) else {
                continue;
            };
            if let Some(effect) = registry.get_mut(index) {
                if !self.members[index] {
                    effect.clear();
                }
                effect.update(entry);
            }
        }

        self.members.fill(false);
        self.indices.clear();
        for entry in settings.iter() {
            if let Some(index) = registry.index_of(&entry.name) {
                self.members[index] = true;
                self.indices.push(index);
            }
        }
        Ok(())
    }

    /// Runs the frame through every entry in order and feeds each effect's meter.
    #[inline]
    pub fn apply(&self, registry: &mut EffectRegistry, frame: &mut PlaybackFrame, t: f64) {
        for &index in &self.indices {
            if let Some(effect) = registry.get_mut(index) {
                effect.apply_to_frame(frame, t);
                effect.core_mut().meter.observe(frame);
            }
        }
    }

    pub fn has_output(&self, registry: &EffectRegistry, t: f64) -> bool {
        self.indices
            .iter()
            .any(|&index| registry.get(index).is_some_and(|effect| effect.has_output(t)))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}
