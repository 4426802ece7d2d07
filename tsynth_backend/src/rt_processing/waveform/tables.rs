use tsynth_core::{BuiltinShape, PlaybackFrame};

use crate::rt_processing::waveform::generators::ShapeGenerator;

/// Pre-rendered stereo frames for one oscillation period or one whole sample.
///
/// Immutable once built; voices share it through an `Arc` and keep their own
/// read position.
#[derive(Debug, Clone)]
pub struct WaveTable {
    frames: Vec<PlaybackFrame>,
    /// Rate the frames were produced at. Oversampled for oscillators,
    /// the file's rate for samples.
    native_sample_rate: f32,
    render_sample_rate: f32,
    /// Set for periodic tables, which hold exactly one period.
    fundamental: Option<f32>,
}

impl WaveTable {
    /// Renders one period of `shape` at `frequency`.
    ///
    /// The table holds `round(oversample · render_rate / frequency)` frames
    /// spanning exactly one period.
    pub fn oscillator(
        shape: BuiltinShape,
        frequency: f32,
        signal_low: f32,
        signal_high: f32,
        render_sample_rate: f32,
        oversample: usize,
        seed: u32,
    ) -> Self {
        let native_sample_rate = render_sample_rate * oversample as f32;
        let len = ((native_sample_rate / frequency).round() as usize).max(1);
        let period_rate = len as f64 * frequency as f64;

        let mut generator = ShapeGenerator::new(shape, frequency, period_rate as f32, seed);
        let frames = (0..len)
            .map(|i| {
                let t = i as f64 / period_rate;
                PlaybackFrame::mono(generator.sample(frequency, signal_low, signal_high, t))
            })
            .collect();

        Self {
            frames,
            native_sample_rate,
            render_sample_rate,
            fundamental: Some(frequency),
        }
    }

    /// Wraps decoded sample frames recorded at `native_sample_rate`.
    pub fn from_frames(frames: Vec<PlaybackFrame>, native_sample_rate: f32, render_sample_rate: f32) -> Self {
        Self {
            frames,
            native_sample_rate,
            render_sample_rate,
            fundamental: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[PlaybackFrame] {
        &self.frames
    }

    pub fn native_sample_rate(&self) -> f32 {
        self.native_sample_rate
    }

    pub fn render_sample_rate(&self) -> f32 {
        self.render_sample_rate
    }

    pub fn fundamental(&self) -> Option<f32> {
        self.fundamental
    }

    /// Frame addressed by stream time: `floor(t · native_rate) mod len`.
    #[inline]
    pub fn frame_at_time(&self, t: f64) -> PlaybackFrame {
        if self.frames.is_empty() {
            return PlaybackFrame::SILENCE;
        }
        let index = (t.max(0.0) * self.native_sample_rate as f64) as u64;
        self.frames[(index % self.frames.len() as u64) as usize]
    }

    #[inline]
    pub fn sample_left(&self, t: f64) -> f32 {
        self.frame_at_time(t).left
    }

    #[inline]
    pub fn sample_right(&self, t: f64) -> f32 {
        self.frame_at_time(t).right
    }

    /// Table frames to advance per rendered frame at the recorded pitch.
    ///
    /// For periodic tables this plays exactly one table per period of the
    /// fundamental, whatever rounding went into the table length.
    pub fn phase_increment(&self) -> f64 {
        match self.fundamental {
            Some(f) => self.frames.len() as f64 * f as f64 / self.render_sample_rate as f64,
            None => self.native_sample_rate as f64 / self.render_sample_rate as f64,
        }
    }

    /// Folds a read position back into `[0, len)`.
    #[inline]
    pub fn wrap(&self, position: f64) -> f64 {
        position.rem_euclid(self.frames.len().max(1) as f64)
    }

    /// Linearly interpolated frame at a fractional read position.
    #[inline]
    pub fn frame_at(&self, position: f64) -> PlaybackFrame {
        let len = self.frames.len();
        if len == 0 {
            return PlaybackFrame::SILENCE;
        }

        let position = self.wrap(position);
        let index = (position as usize).min(len - 1);
        let frac = (position - index as f64) as f32;

        let a = self.frames[index];
        let b = self.frames[(index + 1) % len];
        PlaybackFrame::new(a.left + frac * (b.left - a.left), a.right + frac * (b.right - a.right))
    }
}
