use tsynth_core::{PanLaw, PlaybackFrame};

/// Output gain and left/right balance applied to the voice mix.
///
/// Balance runs from 0.0 (hard left) to 1.0 (hard right).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pan {
    pub gain: f32,
    pub balance: f32,
    pub law: PanLaw,
}

impl Pan {
    pub fn new(gain: f32, balance: f32, law: PanLaw) -> Self {
        Self {
            gain,
            balance: balance.clamp(0.0, 1.0),
            law,
        }
    }

    /// Per-channel multipliers, gain included.
    #[inline(always)]
    pub fn gains(&self) -> (f32, f32) {
        let (l, r) = match self.law {
            PanLaw::Linear => (1.0 - self.balance, self.balance),
            PanLaw::EqualPower => {
                let theta = self.balance * std::f32::consts::FRAC_PI_2;
                (theta.cos(), theta.sin())
            }
        };
        (self.gain * l, self.gain * r)
    }

    #[inline(always)]
    pub fn apply(&self, frame: PlaybackFrame) -> PlaybackFrame {
        let (l, r) = self.gains();
        frame.scaled(l, r)
    }
}

impl Default for Pan {
    fn default() -> Self {
        Self::new(1.0, 0.5, PanLaw::Linear)
    }
}
