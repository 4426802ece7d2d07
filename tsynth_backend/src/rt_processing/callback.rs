//! Render entry point and the lock it shares with the control thread.
//!
//! - One `spin::Mutex` guards the live settings and the effect registry. The
//!   render side holds it for a whole buffer, the control side only for the
//!   narrow hand-off step. Neither side reads shared state without it.
//! - Note events bypass the lock through a bounded lock-free queue.
//! - Statistics are atomics so the control thread can read them any time.
//! - Nothing on the render path allocates, blocks on the OS or logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crossbeam::atomic::AtomicCell;
use crossbeam::queue::ArrayQueue;
use spin::Mutex;

use tsynth_core::{SynthError, SynthSettings};

use crate::rt_processing::accumulator::Accumulator;
use crate::rt_processing::effects::EffectRegistry;
use crate::rt_processing::performance::CallbackTimer;
use crate::rt_processing::synth::Synth;

/// Interleaved output channels.
pub const CHANNELS: usize = 2;

/// Everything both threads mutate.
pub struct SharedSynth {
    pub settings: SynthSettings,
    pub effects: EffectRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub midi_number: u8,
    pub pressed: bool,
}

impl NoteEvent {
    pub fn press(midi_number: u8) -> Self {
        Self {
            midi_number,
            pressed: true,
        }
    }

    pub fn release(midi_number: u8) -> Self {
        Self {
            midi_number,
            pressed: false,
        }
    }
}

/// Counters published by the render thread.
#[derive(Default)]
pub struct EngineStats {
    dropped_notes: AtomicU64,
    queue_overflows: AtomicU64,
    configuration_faults: AtomicU64,
    engaged_voices: AtomicUsize,
    disengaged_voices: AtomicUsize,
    output_level: AtomicCell<(f32, f32)>,
}

/// Plain copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub dropped_notes: u64,
    pub queue_overflows: u64,
    pub configuration_faults: u64,
    pub engaged_voices: usize,
    pub disengaged_voices: usize,
    /// Mean absolute output of the last buffer, per channel.
    pub output_level: (f32, f32),
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dropped_notes: self.dropped_notes.load(Ordering::Relaxed),
            queue_overflows: self.queue_overflows.load(Ordering::Relaxed),
            configuration_faults: self.configuration_faults.load(Ordering::Relaxed),
            engaged_voices: self.engaged_voices.load(Ordering::Relaxed),
            disengaged_voices: self.disengaged_voices.load(Ordering::Relaxed),
            output_level: self.output_level.load(),
        }
    }
}

/// State the audio backend hands to every render call.
pub struct RenderContext {
    shared: Arc<Mutex<SharedSynth>>,
    ready: AtomicBool,
    frame_clock: AtomicU64,
    sample_rate: f32,
    notes: ArrayQueue<NoteEvent>,
    stats: EngineStats,
    timer: CallbackTimer,
}

impl RenderContext {
    pub fn new(shared: SharedSynth, sample_rate: f32, buffer_frames: usize, note_queue_capacity: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(shared)),
            ready: AtomicBool::new(false),
            frame_clock: AtomicU64::new(0),
            sample_rate,
            notes: ArrayQueue::new(note_queue_capacity.max(1)),
            stats: EngineStats::default(),
            timer: CallbackTimer::new(buffer_frames, sample_rate, 0.1),
        }
    }

    /// Runs `f` with exclusive access to the shared state.
    ///
    /// Spins while the other side holds the lock. The guard is released when
    /// `f` returns or unwinds.
    #[inline]
    pub fn critical_section<R>(&self, f: impl FnOnce(&mut SharedSynth) -> R) -> R {
        let mut guard = self.shared.lock();
        f(&mut guard)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Queues a note event for the next buffer. Returns false and counts the
    /// overflow when the queue is full.
    pub fn push_note(&self, event: NoteEvent) -> bool {
        match self.notes.push(event) {
            Ok(()) => true,
            Err(_) => {
                self.stats.queue_overflows.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_clock.load(Ordering::Relaxed)
    }

    /// Seconds of audio rendered so far.
    pub fn stream_time(&self) -> f64 {
        self.frames_rendered() as f64 / self.sample_rate as f64
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn timer(&self) -> &CallbackTimer {
        &self.timer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Setup is not finished. The buffer was zeroed.
    NotReady,
    /// No voice is left; the buffer holds effect tails or silence.
    Silent,
    Playing,
}

/// Render-thread half of the engine. Owns the voices and the chain order.
pub struct AudioController {
    synth: Synth,
}

impl AudioController {
    pub fn new(synth: Synth) -> Self {
        Self { synth }
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    /// Fills `2 · frame_count` interleaved samples starting at `stream_time`.
    ///
    /// Holds the shared lock for the whole buffer: pending settings are
    /// applied first, then queued notes, then every frame is rendered.
    pub fn render(
        &mut self,
        output: &mut [f32],
        frame_count: usize,
        stream_time: f64,
        context: &RenderContext,
    ) -> RenderStatus {
        let _timing = context.timer.time_callback();
        let frame_count = frame_count.min(output.len() / CHANNELS);
        let output = &mut output[..frame_count * CHANNELS];

        if !context.is_ready() {
            output.fill(0.0);
            return RenderStatus::NotReady;
        }

        let sample_period = 1.0 / context.sample_rate as f64;
        let synth = &mut self.synth;
        let stats = &context.stats;

        let (active, level) = context.critical_section(|shared| {
            if shared.settings.is_dirty() {
                if synth.update(&shared.settings, &mut shared.effects).is_err() {
                    stats.configuration_faults.fetch_add(1, Ordering::Relaxed);
                }
                shared.settings.clear_dirty();
            }

            while let Some(event) = context.notes.pop() {
                match synth.set(event.midi_number, event.pressed, stream_time) {
                    Ok(()) => {}
                    Err(SynthError::CapacityExceeded { .. }) => {
                        stats.dropped_notes.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        debug_assert!(!err.is_configuration_fault(), "note {} rejected: {err}", event.midi_number);
                        stats.dropped_notes.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            let mut left = Accumulator::cumulative(true);
            let mut right = Accumulator::cumulative(true);
            let mut active = false;
            for (i, out) in output.chunks_exact_mut(CHANNELS).enumerate() {
                let t = stream_time + i as f64 * sample_period;
                let (frame, alive) = synth.render_frame(t, &mut shared.effects);
                active |= alive;
                out[0] = frame.left;
                out[1] = frame.right;
                left.add(frame.left);
                right.add(frame.right);
            }
            (active, (left.average(), right.average()))
        });

        stats.engaged_voices.store(synth.voices().engaged_count(), Ordering::Relaxed);
        stats.disengaged_voices.store(synth.voices().disengaged_count(), Ordering::Relaxed);
        stats.output_level.store(level);
        context.frame_clock.fetch_add(frame_count as u64, Ordering::Relaxed);
        context.timer.add_frames_rendered(frame_count as u64);

        if active { RenderStatus::Playing } else { RenderStatus::Silent }
    }

    /// Renders the whole of `output` at the context's own stream clock.
    pub fn render_next(&mut self, output: &mut [f32], context: &RenderContext) -> RenderStatus {
        let frame_count = output.len() / CHANNELS;
        self.render(output, frame_count, context.stream_time(), context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsynth_core::{BuiltinShape, EnvelopeSettings, OscillatorParameters, PanLaw, TableReadout};

    use crate::rt_processing::waveform::WaveTableCache;

    const RATE: f32 = 8_000.0;

    fn engine(capacity: usize) -> (AudioController, RenderContext) {
        let effects = EffectRegistry::new();
        let mut settings = SynthSettings::new(effects.settings());
        let mut osc = OscillatorParameters::builtin(BuiltinShape::Square);
        osc.envelope = EnvelopeSettings::new(0.0, 0.0, 1.0, 0.005, 1.0, 1.0);
        settings.set_oscillator(&osc);

        let cache = Arc::new(WaveTableCache::new(RATE, 2, 48, 72));
        cache.prewarm(&osc).unwrap();
        let synth = Synth::new(cache, capacity, TableReadout::Phase, PanLaw::Linear, effects.len());
        let context = RenderContext::new(SharedSynth { settings, effects }, RATE, 64, 8);
        (AudioController::new(synth), context)
    }

    #[test]
    fn test_not_ready_renders_silence() {
        let (mut controller, context) = engine(2);
        let mut output = vec![1.0; 128];
        assert_eq!(controller.render(&mut output, 64, 0.0, &context), RenderStatus::NotReady);
        assert!(output.iter().all(|s| *s == 0.0));
        assert_eq!(context.frames_rendered(), 0);
    }

    #[test]
    fn test_queued_note_is_rendered() {
        let (mut controller, context) = engine(2);
        context.set_ready(true);
        assert!(context.push_note(NoteEvent::press(60)));

        let mut output = vec![0.0; 128];
        assert_eq!(controller.render_next(&mut output, &context), RenderStatus::Playing);
        assert!(output.iter().any(|s| *s != 0.0));
        assert_eq!(context.frames_rendered(), 64);
        assert_eq!(context.stats().engaged_voices, 1);
        assert!(!context.critical_section(|shared| shared.settings.is_dirty()));
    }

    #[test]
    fn test_release_rings_out_then_goes_silent() {
        let (mut controller, context) = engine(2);
        context.set_ready(true);
        let mut output = vec![0.0; 128];

        context.push_note(NoteEvent::press(60));
        controller.render_next(&mut output, &context);
        context.push_note(NoteEvent::release(60));
        // the 5 ms release ends inside this 8 ms buffer
        assert_eq!(controller.render_next(&mut output, &context), RenderStatus::Playing);
        assert_eq!(controller.render_next(&mut output, &context), RenderStatus::Silent);
        assert!(output.iter().all(|s| *s == 0.0));
        assert_eq!(context.stats().disengaged_voices, 0);
    }

    #[test]
    fn test_full_voice_pool_drops_notes() {
        let (mut controller, context) = engine(1);
        context.set_ready(true);
        context.push_note(NoteEvent::press(60));
        context.push_note(NoteEvent::press(62));

        let mut output = vec![0.0; 16];
        controller.render_next(&mut output, &context);
        let stats = context.stats();
        assert_eq!(stats.engaged_voices, 1);
        assert_eq!(stats.dropped_notes, 1);
    }

    #[test]
    fn test_cold_oscillator_is_not_built_while_rendering() {
        let (mut controller, context) = engine(2);
        context.set_ready(true);
        let mut output = vec![0.0; 32];
        controller.render_next(&mut output, &context);
        let cache = Arc::clone(controller.synth().voices().cache());
        let before = cache.cached_oscillators();

        context.critical_section(|shared| {
            let mut quiet = OscillatorParameters::builtin(BuiltinShape::Sine);
            quiet.signal_low = -0.5;
            quiet.signal_high = 0.5;
            shared.settings.set_oscillator(&quiet);
        });
        context.push_note(NoteEvent::press(60));
        controller.render_next(&mut output, &context);

        assert_eq!(cache.cached_oscillators(), before);
        assert_eq!(cache.cached_samples(), 0);
        assert_eq!(context.stats().dropped_notes, 1);
        assert_eq!(context.stats().engaged_voices, 0);
    }

    #[test]
    fn test_full_queue_counts_overflow() {
        let (_, context) = engine(1);
        for _ in 0..8 {
            assert!(context.push_note(NoteEvent::press(60)));
        }
        assert!(!context.push_note(NoteEvent::press(60)));
        assert_eq!(context.stats().queue_overflows, 1);
    }
}
