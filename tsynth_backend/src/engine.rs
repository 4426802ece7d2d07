//! Bootstraps the engine from a [`SynthConfig`].

use std::sync::Arc;

use tracing::info;

use tsynth_core::{Result, SynthConfig, SynthSettings};

use crate::control::{ControlSurface, ControlThread};
use crate::rt_processing::callback::{AudioController, RenderContext, SharedSynth};
use crate::rt_processing::effects::EffectRegistry;
use crate::rt_processing::synth::Synth;
use crate::rt_processing::waveform::WaveTableCache;

/// A ready-to-render engine.
///
/// The controller goes to whichever thread drives audio; the context and the
/// cache are shared with the control thread.
pub struct Engine {
    controller: AudioController,
    context: Arc<RenderContext>,
    cache: Arc<WaveTableCache>,
    config: SynthConfig,
}

impl Engine {
    /// Validates `config`, scans the sound banks, builds the effect registry
    /// and prewarms the configured oscillator. Any configuration problem fails
    /// here rather than on the render thread.
    pub fn build(config: &SynthConfig) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(WaveTableCache::from_config(config)?);
        let effects = EffectRegistry::builtin(config.sample_rate);
        let settings = SynthSettings::from_config(config, effects.settings())?;
        let tables = cache.prewarm(settings.oscillator())?;

        let mut synth = Synth::new(
            Arc::clone(&cache),
            config.polyphony,
            config.readout,
            config.pan_law,
            effects.len(),
        );
        synth.voices_mut().set_template(Arc::clone(settings.shared_oscillator()));
        let context = RenderContext::new(
            SharedSynth { settings, effects },
            config.sample_rate,
            config.buffer_frames,
            config.note_queue_capacity,
        );
        context.set_ready(true);

        info!(
            sample_rate = config.sample_rate,
            polyphony = config.polyphony,
            tables,
            banks = cache.sound_banks().len(),
            "engine ready"
        );

        Ok(Self {
            controller: AudioController::new(synth),
            context: Arc::new(context),
            cache,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<RenderContext> {
        &self.context
    }

    pub fn cache(&self) -> &Arc<WaveTableCache> {
        &self.cache
    }

    pub fn controller_mut(&mut self) -> &mut AudioController {
        &mut self.controller
    }

    /// Starts a control thread for `surface` at the configured cadence.
    pub fn spawn_control<S>(&self, surface: S) -> Result<ControlThread>
    where
        S: ControlSurface + 'static,
    {
        let control = ControlThread::spawn(
            surface,
            Arc::clone(&self.context),
            Arc::clone(&self.cache),
            self.config.control,
        )?;
        Ok(control)
    }

    /// Hands the controller to an audio callback.
    pub fn into_parts(self) -> (AudioController, Arc<RenderContext>, Arc<WaveTableCache>) {
        (self.controller, self.context, self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsynth_core::SynthError;

    use crate::rt_processing::callback::{NoteEvent, RenderStatus};

    fn config() -> SynthConfig {
        SynthConfig {
            sample_rate: 8_000.0,
            buffer_frames: 64,
            midi_low: 57,
            midi_high: 64,
            oversample: 2,
            key_map: [('a', 60)].into_iter().collect(),
            effects: vec!["Low Pass".into(), "Reverb".into()],
            ..SynthConfig::default()
        }
    }

    #[test]
    fn test_build_prewarms_and_applies_chain() {
        let mut engine = Engine::build(&config()).unwrap();
        assert_eq!(engine.cache().cached_oscillators(), 8);
        assert!(engine.context().is_ready());

        engine.context().push_note(NoteEvent::press(60));
        let context = Arc::clone(engine.context());
        let mut output = vec![0.0; 128];
        assert_eq!(engine.controller_mut().render_next(&mut output, &context), RenderStatus::Playing);
        assert_eq!(engine.controller_mut().synth().chain().len(), 2);
        assert_eq!(engine.context().stats().dropped_notes, 0);
    }

    #[test]
    fn test_unknown_effect_fails_at_build() {
        let config = SynthConfig {
            effects: vec!["Flanger".into()],
            ..config()
        };
        let err = Engine::build(&config).err().unwrap();
        assert!(matches!(err, SynthError::Configuration(_)));
    }

    #[test]
    fn test_invalid_config_fails_at_build() {
        let config = SynthConfig {
            polyphony: 0,
            ..config()
        };
        assert!(Engine::build(&config).is_err());
    }
}
