use tsynth_core::{EffectSettings, Parameter, PlaybackFrame};

use crate::rt_processing::effects::{Effect, EffectCore};

pub const DELAY: usize = 0;
pub const GAIN: usize = 1;
pub const FEEDBACK: usize = 2;

/// Longest delay the line is sized for, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 1.0;

/// Fixed-capacity stereo delay line.
///
/// Storage is sized once for [`MAX_DELAY_SECONDS`]; changing the delay
/// only moves the read tap, so parameter changes never allocate.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<PlaybackFrame>,
    write: usize,
    delay: usize,
}

impl DelayLine {
    pub fn new(capacity: usize, delay: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![PlaybackFrame::SILENCE; capacity],
            write: 0,
            delay: delay.clamp(1, capacity),
        }
    }

    pub fn set_delay(&mut self, delay: usize) {
        self.delay = delay.clamp(1, self.buffer.len());
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Frame pushed `delay` frames ago.
    #[inline]
    pub fn front(&self) -> PlaybackFrame {
        let len = self.buffer.len();
        self.buffer[(self.write + len - self.delay) % len]
    }

    #[inline]
    pub fn push(&mut self, frame: PlaybackFrame) {
        self.buffer[self.write] = frame;
        self.write = (self.write + 1) % self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(PlaybackFrame::SILENCE);
        self.write = 0;
    }
}

/// Single-tap comb: `y = x + gain · x[n - d]` (feed-forward) or
/// `y = x + gain · y[n - d]` (feed-back).
pub struct CombFilter {
    core: EffectCore,
    line: DelayLine,
}

impl CombFilter {
    pub fn new(name: &str, delay_seconds: f32, gain: f32, feedback: bool, sample_rate: f32) -> Self {
        let settings = EffectSettings::new(name, false)
            .with_parameter(Parameter::new("Delay", delay_seconds, 0.01, MAX_DELAY_SECONDS))
            .with_parameter(Parameter::new("Gain", gain, 0.0, 1.0))
            .with_parameter(Parameter::new("Feedback", if feedback { 1.0 } else { 0.0 }, 0.0, 1.0));

        let mut comb = Self {
            core: EffectCore::new(settings),
            line: DelayLine::new(1, 1),
        };
        comb.initialize(sample_rate);
        comb
    }

    pub fn is_feedback(&self) -> bool {
        self.core.value(FEEDBACK) > 0.5
    }

    fn delay_frames(&self) -> usize {
        (self.core.value(DELAY) * self.core.sample_rate).round() as usize
    }
}

impl Effect for CombFilter {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn initialize(&mut self, sample_rate: f32) {
        self.core.initialize(sample_rate);
        let capacity = (MAX_DELAY_SECONDS * sample_rate).ceil() as usize;
        self.line = DelayLine::new(capacity, self.delay_frames());
    }

    #[inline]
    fn apply_to_frame(&mut self, frame: &mut PlaybackFrame, _t: f64) {
        let gain = self.core.value(GAIN);
        let input = *frame;
        let output = input + self.line.front() * gain;

        self.line.push(if self.is_feedback() { output } else { input });
        *frame = output;
    }

    fn has_output(&self, _t: f64) -> bool {
        self.core.value(GAIN) > 0.0
    }

    fn clear(&mut self) {
        self.line.clear();
    }

    fn parameters_changed(&mut self) {
        let delay = self.delay_frames();
        self.line.set_delay(delay);
    }
}
