pub mod biquad;
pub mod comb;

pub use biquad::{BiQuadFilter, BiQuadSection, BiQuadType, Coefficients};
pub use comb::{CombFilter, DelayLine};
