/// Fast pseudo-random number generator for audio applications
/// Uses a linear congruential generator (LCG) for deterministic, fast noise
#[derive(Debug, Clone)]
pub struct FastRng {
    state: u32,
}

impl FastRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed }, // Avoid zero seed
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// [0.0, 1.0)
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // top 24 bits fit an f32 mantissa exactly
        (self.next_u32() >> 8) as f32 * (1.0 / 16777216.0)
    }

    /// [-1.0, 1.0)
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        (self.next_f32() - 0.5) * 2.0
    }
}

/// White noise that only sounds for a fixed span after time zero.
///
/// Used as the excitation of the plucked string.
#[derive(Debug, Clone)]
pub struct NoiseBurst {
    rng: FastRng,
    seed: u32,
    duration: f64,
    amplitude: f32,
}

impl NoiseBurst {
    pub fn new(seed: u32, duration: f64) -> Self {
        Self {
            rng: FastRng::new(seed),
            seed,
            duration,
            amplitude: 1.0,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Noise sample for `t` seconds after the burst started, silence afterwards.
    #[inline]
    pub fn sample(&mut self, t: f64) -> f32 {
        if t < self.duration {
            self.rng.next_bipolar() * self.amplitude
        } else {
            0.0
        }
    }

    /// Restarts the sequence so every burst is identical.
    pub fn reset(&mut self) {
        self.rng = FastRng::new(self.seed);
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bipolar_range() {
        let mut rng = FastRng::new(0);
        for _ in 0..10_000 {
            let v = rng.next_bipolar();
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_burst_is_silent_after_duration() {
        let mut burst = NoiseBurst::new(3, 0.001);
        let early: Vec<f32> = (0..10).map(|i| burst.sample(i as f64 * 1e-4)).collect();
        assert!(early.iter().any(|v| *v != 0.0));
        assert_eq!(burst.sample(0.001), 0.0);
        assert_eq!(burst.sample(0.5), 0.0);
    }

    #[test]
    fn test_reset_repeats_sequence() {
        let mut burst = NoiseBurst::new(11, 1.0).with_amplitude(0.5);
        let first: Vec<f32> = (0..16).map(|_| burst.sample(0.0)).collect();
        burst.reset();
        let second: Vec<f32> = (0..16).map(|_| burst.sample(0.0)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|v| v.abs() <= 0.5));
    }
}
