use std::sync::atomic::{AtomicU64, Ordering};

use quanta::{Clock, Instant as QuantaInstant};

/// Render-callback timing as seen by the control thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingSnapshot {
    /// Frames rendered since creation or the last reset.
    pub frames_rendered: u64,
    pub callback_count: u64,
    /// Shortest callback observed, in nanoseconds.
    pub min_callback_nanos: Option<u64>,
    /// Longest callback observed, in nanoseconds.
    pub max_callback_nanos: Option<u64>,
    /// Exponential moving average of callback duration.
    pub ema_callback_nanos: f64,
    /// Time one buffer represents at the stream rate.
    pub budget_nanos: f64,
    /// EMA duration as a share of the budget.
    pub load_percent: f64,
}

/// Lock-free callback timer.
///
/// The render thread only touches atomics here: it opens a
/// [`CallbackTimer::time_callback`] guard per buffer and adds rendered frames.
/// [`CallbackTimer::snapshot`] is for the control thread.
pub struct CallbackTimer {
    clock: Clock,
    budget_nanos: f64,

    frames_rendered: AtomicU64,
    callback_count: AtomicU64,
    min_callback_nanos: AtomicU64,
    max_callback_nanos: AtomicU64,
    /// f64 bits
    ema_callback_bits: AtomicU64,

    ema_alpha: f64,
}

impl CallbackTimer {
    /// `ema_alpha` in `(0, 1]`; out-of-range values fall back to 0.1.
    pub fn new(buffer_frames: usize, sample_rate: f32, ema_alpha: f64) -> Self {
        let ema_alpha = if ema_alpha > 0.0 && ema_alpha <= 1.0 { ema_alpha } else { 0.1 };
        let budget_nanos = if sample_rate > 0.0 {
            buffer_frames as f64 / sample_rate as f64 * 1_000_000_000.0
        } else {
            0.0
        };

        Self {
            clock: Clock::new(),
            budget_nanos,
            frames_rendered: AtomicU64::new(0),
            callback_count: AtomicU64::new(0),
            min_callback_nanos: AtomicU64::new(u64::MAX),
            max_callback_nanos: AtomicU64::new(0),
            ema_callback_bits: AtomicU64::new(0.0f64.to_bits()),
            ema_alpha,
        }
    }

    #[inline(always)]
    pub fn add_frames_rendered(&self, frames: u64) {
        self.frames_rendered.fetch_add(frames, Ordering::Relaxed);
    }

    /// Folds one callback duration into min, max and the moving average.
    #[inline(always)]
    pub fn record_nanos(&self, nanos: u64) {
        self.min_callback_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_callback_nanos.fetch_max(nanos, Ordering::Relaxed);

        let alpha = self.ema_alpha;
        let _ = self
            .ema_callback_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let old = f64::from_bits(bits);
                Some((alpha * nanos as f64 + (1.0 - alpha) * old).to_bits())
            });
    }

    /// Counts a callback and times it until the guard drops.
    #[inline(always)]
    pub fn time_callback(&self) -> CallbackGuard<'_> {
        self.callback_count.fetch_add(1, Ordering::Relaxed);
        CallbackGuard {
            timer: self,
            start: self.clock.now(),
        }
    }

    pub fn snapshot(&self) -> TimingSnapshot {
        let min = self.min_callback_nanos.load(Ordering::Relaxed);
        let max = self.max_callback_nanos.load(Ordering::Relaxed);
        let ema = f64::from_bits(self.ema_callback_bits.load(Ordering::Relaxed));

        TimingSnapshot {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            callback_count: self.callback_count.load(Ordering::Relaxed),
            min_callback_nanos: (min != u64::MAX).then_some(min),
            max_callback_nanos: (max != 0).then_some(max),
            ema_callback_nanos: ema,
            budget_nanos: self.budget_nanos,
            load_percent: if self.budget_nanos > 0.0 {
                ema / self.budget_nanos * 100.0
            } else {
                0.0
            },
        }
    }

    /// Forgets min, max and the average so new peaks are collected.
    pub fn reset_peaks(&self) {
        self.min_callback_nanos.store(u64::MAX, Ordering::Relaxed);
        self.max_callback_nanos.store(0, Ordering::Relaxed);
        self.ema_callback_bits.store(0.0f64.to_bits(), Ordering::Relaxed);
    }
}

/// Records the elapsed time since [`CallbackTimer::time_callback`] on drop.
pub struct CallbackGuard<'a> {
    timer: &'a CallbackTimer,
    start: QuantaInstant,
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.timer.clock.now().saturating_duration_since(self.start);
        self.timer
            .record_nanos(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX));
    }
}
