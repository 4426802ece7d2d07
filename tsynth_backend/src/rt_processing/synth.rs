use std::sync::Arc;

use tsynth_core::{PanLaw, PlaybackFrame, Result, SynthSettings, TableReadout};

use crate::rt_processing::effects::{EffectRegistry, SignalChain};
use crate::rt_processing::routing::Pan;
use crate::rt_processing::voice_renderer::VoiceMap;
use crate::rt_processing::waveform::WaveTableCache;

/// Voice mix followed by the post-processing chain.
pub struct Synth {
    voices: VoiceMap,
    chain: SignalChain,
    pan: Pan,
}

impl Synth {
    pub fn new(
        cache: Arc<WaveTableCache>,
        polyphony: usize,
        readout: TableReadout,
        pan_law: PanLaw,
        registry_len: usize,
    ) -> Self {
        Self {
            voices: VoiceMap::new(polyphony, cache, readout),
            chain: SignalChain::new(registry_len),
            pan: Pan::new(1.0, 0.5, pan_law),
        }
    }

    /// Pulls the live settings into the voice template, output stage and chain.
    ///
    /// The template handle is shared with the settings, so a change costs one
    /// reference count. Held notes keep the oscillator they started with.
    pub fn update(&mut self, settings: &SynthSettings, registry: &mut EffectRegistry) -> Result<()> {
        let template = settings.shared_oscillator();
        if !Arc::ptr_eq(self.voices.shared_template(), template) {
            self.voices.set_template(Arc::clone(template));
        }
        self.pan = Pan::new(settings.output_gain(), settings.output_balance(), self.pan.law);
        self.chain.update(settings.signal_chain(), registry)
    }

    pub fn set(&mut self, midi_number: u8, pressed: bool, t: f64) -> Result<()> {
        self.voices.set_note(midi_number, pressed, t)
    }

    /// Renders one frame at `t`. The chain runs even when no voice is left so
    /// echoes and reverb tails decay naturally.
    ///
    /// Returns the frame and whether any voice is still alive.
    #[inline]
    pub fn render_frame(&mut self, t: f64, registry: &mut EffectRegistry) -> (PlaybackFrame, bool) {
        let mut frame = PlaybackFrame::SILENCE;
        let active = self.voices.render_frame(t, &self.pan, &mut frame);
        self.chain.apply(registry, &mut frame, t);
        (frame, active)
    }

    pub fn voices(&self) -> &VoiceMap {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceMap {
        &mut self.voices
    }

    pub fn chain(&self) -> &SignalChain {
        &self.chain
    }

    pub fn pan(&self) -> &Pan {
        &self.pan
    }
}
