//! Control thread and the control-surface boundary.
//!
//! The control thread polls a [`ControlSurface`] for key events every
//! `poll_ms` and turns them into note events on the lock-free queue. Every
//! `handoff_ms` it takes the shared lock, lets the surface apply its pending
//! edits and captures a [`UiSnapshot`]. Everything else, including wave-table
//! pre-warming and drawing, happens outside the lock.
//!
//! A new oscillator is not left in the shared settings until its tables are
//! built. The hand-off puts the previous template back, prewarms outside the
//! lock and then installs the new one in a second short critical section.
//! Replaced templates are kept here until no voice holds them, so the render
//! thread never frees one.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use tsynth_core::{ControlTiming, EffectSettings, OscillatorParameters, SynthSettings};

use crate::rt_processing::callback::{NoteEvent, RenderContext, SharedSynth, StatsSnapshot};
use crate::rt_processing::performance::TimingSnapshot;
use crate::rt_processing::waveform::WaveTableCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(char),
    Released(char),
}

/// What one poll produced.
#[derive(Debug, Default)]
pub struct SurfaceInput {
    pub keys: Vec<KeyEvent>,
    /// Set by the surface to end the control loop.
    pub quit: bool,
}

/// A chain entry as the surface shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectView {
    pub settings: EffectSettings,
    pub clipping: bool,
}

/// Non-destructive copy of everything a surface displays.
#[derive(Debug, Clone, PartialEq)]
pub struct UiSnapshot {
    pub oscillator: OscillatorParameters,
    pub chain: Vec<EffectView>,
    pub available_effects: Vec<String>,
    pub output_gain: f32,
    pub output_balance: f32,
    pub midi_low: u8,
    pub midi_high: u8,
    pub stats: StatsSnapshot,
    pub timing: TimingSnapshot,
    pub stream_time: f64,
}

impl UiSnapshot {
    /// Reads the shared state. Call only while holding the lock.
    pub fn capture(shared: &SharedSynth) -> Self {
        let settings = &shared.settings;
        let chain = settings
            .signal_chain()
            .iter()
            .map(|entry| EffectView {
                clipping: shared.effects.by_name(&entry.name).is_some_and(|e| e.is_clipping()),
                settings: entry.clone(),
            })
            .collect();

        Self {
            oscillator: settings.oscillator().clone(),
            chain,
            available_effects: settings.signal_chain().registry_names(),
            output_gain: settings.output_gain(),
            output_balance: settings.output_balance(),
            midi_low: settings.midi_low(),
            midi_high: settings.midi_high(),
            stats: StatsSnapshot::default(),
            timing: TimingSnapshot::default(),
            stream_time: 0.0,
        }
    }

    /// Fills in the lock-free counters.
    pub fn with_counters(mut self, context: &RenderContext) -> Self {
        self.stats = context.stats();
        self.timing = context.timer().snapshot();
        self.stream_time = context.stream_time();
        self
    }
}

/// User-facing side of the engine: a window, a terminal, a script.
pub trait ControlSurface: Send {
    /// Collects input since the last poll. Runs without the lock.
    fn poll(&mut self, input: &mut SurfaceInput);

    /// Applies pending edits to the live settings. Runs under the lock and
    /// must stay short. With `clear_dirty` the surface forgets the edits it
    /// just applied.
    fn from_ui(&mut self, settings: &mut SynthSettings, clear_dirty: bool);

    /// Shows the latest state. Runs without the lock.
    fn to_ui(&mut self, snapshot: &UiSnapshot);
}

/// Handle to the running control loop.
pub struct ControlThread {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ControlThread {
    pub fn spawn<S>(
        surface: S,
        context: Arc<RenderContext>,
        cache: Arc<WaveTableCache>,
        timing: ControlTiming,
    ) -> io::Result<Self>
    where
        S: ControlSurface + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded(1);
        let handle = thread::Builder::new()
            .name("tsynth-control".into())
            .spawn(move || ControlLoop::new(surface, context, cache).run(timing, stop_rx))?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// True once the loop has returned, e.g. after the surface asked to quit.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the surface to quit on its own.
    pub fn join(mut self) {
        self.wait();
    }

    /// Stops the loop and waits for it.
    pub fn shutdown(mut self) {
        self.stop_and_wait();
    }

    fn stop_and_wait(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        self.wait();
    }

    fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("control thread panicked");
            }
        }
    }
}

impl Drop for ControlThread {
    fn drop(&mut self) {
        self.stop_and_wait();
    }
}

struct ControlLoop<S> {
    surface: S,
    context: Arc<RenderContext>,
    cache: Arc<WaveTableCache>,
    // copy of the settings' key map, refreshed at every hand-off
    key_map: BTreeMap<char, u8>,
    // template the shared settings hold; its tables are built
    warm: Arc<OscillatorParameters>,
    retired: Vec<Arc<OscillatorParameters>>,
    input: SurfaceInput,
}

impl<S: ControlSurface> ControlLoop<S> {
    /// The starting oscillator counts as warm; the engine prewarms it at build.
    fn new(surface: S, context: Arc<RenderContext>, cache: Arc<WaveTableCache>) -> Self {
        let warm = context.critical_section(|shared| Arc::clone(shared.settings.shared_oscillator()));
        Self {
            surface,
            context,
            cache,
            key_map: BTreeMap::new(),
            warm,
            retired: Vec::new(),
            input: SurfaceInput::default(),
        }
    }

    fn run(mut self, timing: ControlTiming, stop: Receiver<()>) {
        info!(poll_ms = timing.poll_ms, handoff_ms = timing.handoff_ms, "control thread started");
        let poll = channel::tick(Duration::from_millis(timing.poll_ms.max(1)));
        let handoff = channel::tick(Duration::from_millis(timing.handoff_ms.max(1)));

        self.handoff();
        loop {
            channel::select! {
                recv(stop) -> _ => break,
                recv(poll) -> _ => {
                    if !self.poll() {
                        break;
                    }
                }
                recv(handoff) -> _ => self.handoff(),
            }
        }

        // last edits still reach the engine
        self.handoff();
        info!(stream_time = self.context.stream_time(), "control thread stopped");
    }

    /// Returns false when the surface asked to quit.
    fn poll(&mut self) -> bool {
        self.surface.poll(&mut self.input);
        for key in self.input.keys.drain(..) {
            let (ch, pressed) = match key {
                KeyEvent::Pressed(ch) => (ch, true),
                KeyEvent::Released(ch) => (ch, false),
            };
            let Some(&midi_number) = self.key_map.get(&ch) else {
                continue;
            };
            let event = NoteEvent { midi_number, pressed };
            if !self.context.push_note(event) {
                debug!(midi_number, pressed, "note queue full, event dropped");
            }
        }
        !std::mem::take(&mut self.input.quit)
    }

    fn handoff(&mut self) {
        let surface = &mut self.surface;
        let key_map = &mut self.key_map;
        let warm = &self.warm;
        let (mut snapshot, dirty, incoming) = self.context.critical_section(|shared| {
            let settings = &mut shared.settings;
            surface.from_ui(settings, true);
            if settings.key_map() != key_map {
                key_map.clone_from(settings.key_map());
            }

            let incoming = if Arc::ptr_eq(settings.shared_oscillator(), warm) {
                None
            } else if settings.oscillator() == warm.as_ref() {
                settings.replace_oscillator(Arc::clone(warm));
                None
            } else {
                Some(settings.replace_oscillator(Arc::clone(warm)))
            };
            (UiSnapshot::capture(shared), shared.settings.is_dirty(), incoming)
        });

        if dirty {
            debug!(chain = snapshot.chain.len(), gain = snapshot.output_gain, "settings handed off");
        }
        if let Some(incoming) = incoming {
            self.install(incoming, &mut snapshot);
        }
        self.retired.retain(|template| Arc::strong_count(template) > 1);

        self.surface.to_ui(&snapshot.with_counters(&self.context));
    }

    /// Builds the tables for `incoming`, then makes it the shared template.
    /// An oscillator whose tables cannot be built is dropped.
    fn install(&mut self, incoming: Arc<OscillatorParameters>, snapshot: &mut UiSnapshot) {
        let tables = match self.cache.prewarm(&incoming) {
            Ok(tables) => tables,
            Err(err) => {
                warn!(error = %err, "oscillator edit rejected");
                return;
            }
        };

        self.context
            .critical_section(|shared| shared.settings.replace_oscillator(Arc::clone(&incoming)));
        snapshot.oscillator = OscillatorParameters::clone(&incoming);
        let previous = std::mem::replace(&mut self.warm, incoming);
        self.retired.push(previous);
        debug!(tables, retired = self.retired.len(), "oscillator changed");
    }
}
