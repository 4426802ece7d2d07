use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use tsynth_backend::rt_processing::callback::{AudioController, RenderContext, SharedSynth};
use tsynth_backend::rt_processing::effects::{Effect, EffectCore, EffectRegistry};
use tsynth_backend::rt_processing::synth::Synth;
use tsynth_backend::rt_processing::waveform::WaveTableCache;
use tsynth_core::{EffectSettings, PanLaw, PlaybackFrame, SynthSettings, TableReadout};

const EFFECTS: usize = 6;

/// Adds 1.0 to both channels, so silence through `n` of them renders `n`.
struct Step {
    core: EffectCore,
}

impl Effect for Step {
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
        frame.left += 1.0;
        frame.right += 1.0;
    }

    fn has_output(&self, _t: f64) -> bool {
        true
    }

    fn clear(&mut self) {}
}

fn step_name(i: usize) -> String {
    format!("Step {i}")
}

fn engine() -> (AudioController, Arc<RenderContext>) {
    let mut effects = EffectRegistry::new();
    for i in 0..EFFECTS {
        let core = EffectCore::new(EffectSettings::new(step_name(i), false));
        effects.register(Box::new(Step { core })).unwrap();
    }

    let mut settings = SynthSettings::new(effects.settings());
    settings.set_output_gain(0.0);

    let cache = Arc::new(WaveTableCache::new(8_000.0, 2, 60, 60));
    let synth = Synth::new(cache, 1, TableReadout::Phase, PanLaw::Linear, effects.len());
    let context = RenderContext::new(SharedSynth { settings, effects }, 8_000.0, 16, 4);
    context.set_ready(true);
    (AudioController::new(synth), Arc::new(context))
}

/// Chain of the first `n` steps and a gain of `n / 10`, in one critical section.
fn hand_off(shared: &mut SharedSynth, n: usize) {
    let names: Vec<String> = (0..n).map(step_name).collect();
    let mut chain = shared.settings.signal_chain().clone();
    chain.set_chain(names.as_slice()).unwrap();
    shared.settings.set_signal_chain(&chain);
    shared.settings.set_output_gain(n as f32 / 10.0);
}

/// Renders one buffer and returns the chain length every part of it agreed on.
fn render_consistent(controller: &mut AudioController, context: &RenderContext) -> usize {
    let mut output = [0.0f32; 32];
    controller.render_next(&mut output, context);

    let synth = controller.synth();
    let chain_len = synth.chain().len();
    assert_eq!((synth.pan().gain * 10.0).round() as usize, chain_len);
    assert!(output.iter().all(|s| *s == chain_len as f32), "buffer mixed two chains: {output:?}");
    chain_len
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn handoffs_are_never_seen_half_applied(steps in prop::collection::vec(0..=EFFECTS, 1..40)) {
        let (mut controller, context) = engine();
        let last = *steps.last().unwrap();

        let writer = {
            let context = Arc::clone(&context);
            thread::spawn(move || {
                for n in steps {
                    context.critical_section(|shared| hand_off(shared, n));
                    thread::yield_now();
                }
            })
        };

        while !writer.is_finished() {
            render_consistent(&mut controller, &context);
        }
        writer.join().unwrap();

        prop_assert_eq!(render_consistent(&mut controller, &context), last);
    }
}
