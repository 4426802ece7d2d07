/// Running mean of a signal, optionally over a fixed window.
///
/// With a window of `n` samples the mean is published once every `n` samples
/// and the running sum restarts, so no sample history is kept.
#[derive(Debug, Clone)]
pub struct Accumulator {
    use_absolute: bool,
    window: Option<u32>,
    counter: u32,
    running_mean: f64,
    window_sum: f64,
    published: f64,
    total: f64,
}

impl Accumulator {
    /// Cumulative mean over everything added since the last reset.
    pub fn cumulative(use_absolute: bool) -> Self {
        Self::build(use_absolute, None)
    }

    /// Mean over consecutive windows of `window` samples.
    pub fn windowed(use_absolute: bool, window: u32) -> Self {
        Self::build(use_absolute, Some(window.max(1)))
    }

    fn build(use_absolute: bool, window: Option<u32>) -> Self {
        Self {
            use_absolute,
            window,
            counter: 0,
            running_mean: 0.0,
            window_sum: 0.0,
            published: 0.0,
            total: 0.0,
        }
    }

    #[inline]
    pub fn add(&mut self, value: f32) {
        let v = if self.use_absolute { value.abs() } else { value } as f64;
        self.total += value as f64;

        match self.window {
            Some(window) => {
                self.window_sum += v;
                self.counter += 1;
                if self.counter >= window {
                    self.published = self.window_sum / self.counter as f64;
                    self.window_sum = 0.0;
                    self.counter = 0;
                }
            }
            None => {
                self.counter = self.counter.saturating_add(1);
                self.running_mean += (v - self.running_mean) / self.counter as f64;
            }
        }
    }

    /// Mean of the last completed window, or the cumulative mean.
    #[inline]
    pub fn average(&self) -> f32 {
        match self.window {
            Some(_) => self.published as f32,
            None => self.running_mean as f32,
        }
    }

    /// Signed sum of every value added.
    pub fn total(&self) -> f32 {
        self.total as f32
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.running_mean = 0.0;
        self.window_sum = 0.0;
        self.published = 0.0;
        self.total = 0.0;
    }
}
