use std::ops::{Add, AddAssign, Mul};

/// A single stereo sample pair.
///
/// Frames are never dithered or clamped here; a value outside `[-1, 1]` is
/// carried through so meters further down the line can see it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackFrame {
    pub left: f32,
    pub right: f32,
}

impl PlaybackFrame {
    pub const SILENCE: PlaybackFrame = PlaybackFrame { left: 0.0, right: 0.0 };

    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Same value on both channels.
    pub fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    pub fn set(&mut self, left: f32, right: f32) {
        self.left = left;
        self.right = right;
    }

    pub fn clear(&mut self) {
        *self = Self::SILENCE;
    }

    /// Scales each channel independently.
    pub fn scaled(self, left_gain: f32, right_gain: f32) -> Self {
        Self {
            left: self.left * left_gain,
            right: self.right * right_gain,
        }
    }

    pub fn is_clipping(&self) -> bool {
        self.left.abs() > 1.0 || self.right.abs() > 1.0
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

impl Add for PlaybackFrame {
    type Output = PlaybackFrame;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            left: self.left + rhs.left,
            right: self.right + rhs.right,
        }
    }
}

impl AddAssign for PlaybackFrame {
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

impl Mul<f32> for PlaybackFrame {
    type Output = PlaybackFrame;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            left: self.left * rhs,
            right: self.right * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipping_is_observed_not_clamped() {
        let frame = PlaybackFrame::new(1.5, -0.2);
        assert!(frame.is_clipping());
        assert_eq!(frame.left, 1.5);

        let quiet = PlaybackFrame::new(1.0, -1.0);
        assert!(!quiet.is_clipping());
    }

    #[test]
    fn test_frame_arithmetic() {
        let mut frame = PlaybackFrame::mono(0.25);
        frame += PlaybackFrame::new(0.25, 0.5);
        assert_eq!(frame, PlaybackFrame::new(0.5, 0.75));
        assert_eq!(frame * 2.0, PlaybackFrame::new(1.0, 1.5));
        assert_eq!(frame.scaled(0.0, 1.0), PlaybackFrame::new(0.0, 0.75));
    }
}
