//! Single-sample waveform generators.
//!
//! The periodic shapes are pure functions of `(frequency, low, high, t)`.
//! The plucked string carries filter state and must be reset between tables.

use std::f64::consts::TAU;

use tsynth_core::{BuiltinShape, PlaybackFrame};

use crate::rt_processing::filters::biquad::{BiQuadSection, BiQuadType, Coefficients};
use crate::rt_processing::filters::comb::DelayLine;
use crate::rt_processing::waveform::noise::NoiseBurst;

/// Length of the noise excitation of a pluck, in seconds.
pub const PLUCK_ATTACK_SECONDS: f64 = 0.001;
/// Comb delay of the pluck resonator, in seconds.
pub const PLUCK_COMB_SECONDS: f64 = 0.05;
/// Q of the pluck low-pass. Heavily damped.
pub const PLUCK_Q: f32 = 0.01;

/// Position inside the current period, in `[0, 1)`.
#[inline]
fn period_fraction(frequency: f32, t: f64) -> f64 {
    (frequency as f64 * t).rem_euclid(1.0)
}

/// Maps a bipolar value in `[-1, 1]` onto `[low, high]`.
#[inline]
fn scale(unit: f64, low: f32, high: f32) -> f32 {
    let mid = 0.5 * (high as f64 + low as f64);
    let amplitude = 0.5 * (high as f64 - low as f64);
    (mid + amplitude * unit) as f32
}

#[inline]
pub fn sine(frequency: f32, low: f32, high: f32, t: f64) -> f32 {
    scale((TAU * period_fraction(frequency, t)).sin(), low, high)
}

#[inline]
pub fn square(frequency: f32, low: f32, high: f32, t: f64) -> f32 {
    if period_fraction(frequency, t) < 0.5 { high } else { low }
}

/// Linear ramp from `low` to `high` across one period.
#[inline]
pub fn sawtooth(frequency: f32, low: f32, high: f32, t: f64) -> f32 {
    let p = period_fraction(frequency, t);
    (low as f64 + (high as f64 - low as f64) * p) as f32
}

/// Rises from the midpoint to `high`, falls to `low`, returns to the midpoint.
#[inline]
pub fn triangle(frequency: f32, low: f32, high: f32, t: f64) -> f32 {
    let p = period_fraction(frequency, t);
    let unit = if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    };
    scale(unit, low, high)
}

/// Karplus-Strong style pluck: a short noise burst through a feed-forward
/// comb in series with a low-pass tuned to the fundamental.
#[derive(Debug, Clone)]
pub struct PluckedString {
    burst: NoiseBurst,
    comb: DelayLine,
    low_pass: BiQuadSection,
}

impl PluckedString {
    /// `table_rate` is the rate the generator is sampled at.
    pub fn new(frequency: f32, table_rate: f32, seed: u32) -> Self {
        let delay = (PLUCK_COMB_SECONDS * table_rate as f64).round() as usize;
        let coefficients = Coefficients::design(BiQuadType::LowPass, 0.0, frequency, PLUCK_Q, table_rate);
        Self {
            burst: NoiseBurst::new(seed, PLUCK_ATTACK_SECONDS),
            comb: DelayLine::new(delay.max(1), delay),
            low_pass: BiQuadSection::new(coefficients),
        }
    }

    /// Clears filter history and restarts the noise sequence.
    pub fn reset(&mut self) {
        self.burst.reset();
        self.comb.clear();
        self.low_pass.clear();
    }

    /// Next sample. `t` must advance monotonically from zero after a reset.
    pub fn next(&mut self, low: f32, high: f32, t: f64) -> f32 {
        let input = PlaybackFrame::mono(self.burst.sample(t));

        // feed-forward comb, unity gain
        let mut frame = input + self.comb.front();
        self.comb.push(input);

        self.low_pass.process(&mut frame);
        scale(frame.left.clamp(-1.0, 1.0) as f64, low, high)
    }
}

/// Stateful sampler for any built-in shape. Built fresh for every table.
pub enum ShapeGenerator {
    Periodic(fn(f32, f32, f32, f64) -> f32),
    Pluck(PluckedString),
}

impl ShapeGenerator {
    pub fn new(shape: BuiltinShape, frequency: f32, table_rate: f32, seed: u32) -> Self {
        match shape {
            BuiltinShape::Sine => ShapeGenerator::Periodic(sine),
            BuiltinShape::Square => ShapeGenerator::Periodic(square),
            BuiltinShape::Triangle => ShapeGenerator::Periodic(triangle),
            BuiltinShape::Sawtooth => ShapeGenerator::Periodic(sawtooth),
            BuiltinShape::PluckedString => ShapeGenerator::Pluck(PluckedString::new(frequency, table_rate, seed)),
        }
    }

    #[inline]
    pub fn sample(&mut self, frequency: f32, low: f32, high: f32, t: f64) -> f32 {
        match self {
            ShapeGenerator::Periodic(f) => f(frequency, low, high, t),
            ShapeGenerator::Pluck(pluck) => pluck.next(low, high, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: f32 = 100.0;

    #[test]
    fn test_sine_matches_reference() {
        for i in 0..100 {
            let t = i as f64 * 0.000_37;
            let expected = (TAU * F as f64 * t).sin() as f32;
            assert!((sine(F, -1.0, 1.0, t) - expected).abs() < 1e-5);
        }
        // custom range is scaled, not clipped
        assert!((sine(F, 0.0, 1.0, 0.0025) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_square_halves() {
        assert_eq!(square(F, -0.5, 0.5, 0.0), 0.5);
        assert_eq!(square(F, -0.5, 0.5, 0.004), 0.5);
        assert_eq!(square(F, -0.5, 0.5, 0.006), -0.5);
        assert_eq!(square(F, -0.5, 0.5, 0.0149), 0.5);
    }

    #[test]
    fn test_sawtooth_ramps_low_to_high() {
        assert_eq!(sawtooth(F, -1.0, 1.0, 0.0), -1.0);
        assert!((sawtooth(F, -1.0, 1.0, 0.005) - 0.0).abs() < 1e-5);
        assert!(sawtooth(F, -1.0, 1.0, 0.00999) > 0.99);
    }

    #[test]
    fn test_triangle_is_symmetric() {
        let q = 0.0025;
        assert!((triangle(F, -1.0, 1.0, 0.0)).abs() < 1e-6);
        assert!((triangle(F, -1.0, 1.0, q) - 1.0).abs() < 1e-5);
        assert!((triangle(F, -1.0, 1.0, 2.0 * q)).abs() < 1e-5);
        assert!((triangle(F, -1.0, 1.0, 3.0 * q) + 1.0).abs() < 1e-5);

        for i in 1..50 {
            let dt = i as f64 * 0.00004;
            let rise = triangle(F, 0.0, 2.0, q - dt);
            let fall = triangle(F, 0.0, 2.0, q + dt);
            assert!((rise - fall).abs() < 1e-4);
        }
    }

    #[test]
    fn test_generators_stay_in_range() {
        for shape in [BuiltinShape::Sine, BuiltinShape::Square, BuiltinShape::Triangle, BuiltinShape::Sawtooth] {
            let mut generator = ShapeGenerator::new(shape, 220.0, 44_100.0, 1);
            for i in 0..1000 {
                let v = generator.sample(220.0, -0.25, 0.75, i as f64 / 44_100.0);
                assert!((-0.25 - 1e-5..=0.75 + 1e-5).contains(&v), "{shape:?} gave {v}");
            }
        }
    }

    #[test]
    fn test_pluck_reset_repeats_output() {
        let rate = 176_400.0;
        let mut pluck = PluckedString::new(220.0, rate, 5);
        let first: Vec<f32> = (0..400).map(|i| pluck.next(-1.0, 1.0, i as f64 / rate as f64)).collect();
        pluck.reset();
        let second: Vec<f32> = (0..400).map(|i| pluck.next(-1.0, 1.0, i as f64 / rate as f64)).collect();

        assert_eq!(first, second);
        assert!(first.iter().any(|v| v.abs() > 0.0));
        assert!(first.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
