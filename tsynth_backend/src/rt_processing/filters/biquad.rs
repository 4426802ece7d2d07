//! Second-order IIR section with the audio-EQ cookbook responses.

use std::f32::consts::PI;

use tsynth_core::{EffectSettings, Parameter, PlaybackFrame};

use crate::rt_processing::effects::{Effect, EffectCore};

pub const GAIN_DB: usize = 0;
pub const CORNER: usize = 1;
pub const Q: usize = 2;

/// Highest corner frequency as a fraction of the sample rate.
const MAX_CORNER_RATIO: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiQuadType {
    LowPass,
    HighPass,
    /// Constant skirt gain, peak gain = Q.
    BandPassGain,
    /// Constant 0 dB peak gain.
    BandPassFlat,
    Notch,
    AllPass,
    PeakingEq,
    LowShelf,
    HighShelf,
}

impl BiQuadType {
    pub const ALL: [BiQuadType; 9] = [
        BiQuadType::LowPass,
        BiQuadType::HighPass,
        BiQuadType::BandPassGain,
        BiQuadType::BandPassFlat,
        BiQuadType::Notch,
        BiQuadType::AllPass,
        BiQuadType::PeakingEq,
        BiQuadType::LowShelf,
        BiQuadType::HighShelf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BiQuadType::LowPass => "Low Pass",
            BiQuadType::HighPass => "High Pass",
            BiQuadType::BandPassGain => "Band Pass",
            BiQuadType::BandPassFlat => "Band Pass Flat",
            BiQuadType::Notch => "Notch",
            BiQuadType::AllPass => "All Pass",
            BiQuadType::PeakingEq => "Peaking EQ",
            BiQuadType::LowShelf => "Low Shelf",
            BiQuadType::HighShelf => "High Shelf",
        }
    }
}

/// Cookbook coefficients, raw (not yet divided by `a0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
}

impl Coefficients {
    pub const IDENTITY: Coefficients = Coefficients {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    };

    pub fn design(kind: BiQuadType, gain_db: f32, corner: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * corner / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        // shelving and peaking gain
        let a = 10f32.powf(gain_db / 40.0);

        match kind {
            BiQuadType::LowPass => Self {
                b0: 0.5 * (1.0 - cos_w0),
                b1: 1.0 - cos_w0,
                b2: 0.5 * (1.0 - cos_w0),
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::HighPass => Self {
                b0: 0.5 * (1.0 + cos_w0),
                b1: -(1.0 + cos_w0),
                b2: 0.5 * (1.0 + cos_w0),
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::BandPassGain => Self {
                b0: q * alpha,
                b1: 0.0,
                b2: -q * alpha,
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::BandPassFlat => Self {
                b0: alpha,
                b1: 0.0,
                b2: -alpha,
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::Notch => Self {
                b0: 1.0,
                b1: -2.0 * cos_w0,
                b2: 1.0,
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::AllPass => Self {
                b0: 1.0 - alpha,
                b1: -2.0 * cos_w0,
                b2: 1.0 + alpha,
                ..Self::poles(alpha, cos_w0)
            },
            BiQuadType::PeakingEq => Self {
                a0: 1.0 + alpha / a,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha / a,
                b0: 1.0 + alpha * a,
                b1: -2.0 * cos_w0,
                b2: 1.0 - alpha * a,
            },
            BiQuadType::LowShelf => {
                let shelf = 2.0 * a.sqrt() * alpha;
                Self {
                    a0: (a + 1.0) + (a - 1.0) * cos_w0 + shelf,
                    a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a2: (a + 1.0) + (a - 1.0) * cos_w0 - shelf,
                    b0: a * ((a + 1.0) - (a - 1.0) * cos_w0 + shelf),
                    b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    b2: a * ((a + 1.0) - (a - 1.0) * cos_w0 - shelf),
                }
            }
            BiQuadType::HighShelf => {
                let shelf = 2.0 * a.sqrt() * alpha;
                Self {
                    a0: (a + 1.0) - (a - 1.0) * cos_w0 + shelf,
                    a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a2: (a + 1.0) - (a - 1.0) * cos_w0 - shelf,
                    b0: a * ((a + 1.0) + (a - 1.0) * cos_w0 + shelf),
                    b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    b2: a * ((a + 1.0) + (a - 1.0) * cos_w0 - shelf),
                }
            }
        }
    }

    /// Denominator shared by the non-gain responses.
    fn poles(alpha: f32, cos_w0: f32) -> Self {
        Self {
            a0: 1.0 + alpha,
            a1: -2.0 * cos_w0,
            a2: 1.0 - alpha,
            ..Self::IDENTITY
        }
    }
}

/// Direct form I state and normalized coefficients for a stereo pair.
#[derive(Debug, Clone)]
pub struct BiQuadSection {
    // normalized by a0
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    input1: PlaybackFrame,
    input2: PlaybackFrame,
    output1: PlaybackFrame,
    output2: PlaybackFrame,
}

impl BiQuadSection {
    pub fn new(coefficients: Coefficients) -> Self {
        let mut section = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            input1: PlaybackFrame::SILENCE,
            input2: PlaybackFrame::SILENCE,
            output1: PlaybackFrame::SILENCE,
            output2: PlaybackFrame::SILENCE,
        };
        section.set_coefficients(coefficients);
        section
    }

    pub fn set_coefficients(&mut self, c: Coefficients) {
        let a0_inv = 1.0 / c.a0;
        self.b0 = c.b0 * a0_inv;
        self.b1 = c.b1 * a0_inv;
        self.b2 = c.b2 * a0_inv;
        self.a1 = c.a1 * a0_inv;
        self.a2 = c.a2 * a0_inv;
    }

    #[inline]
    pub fn process(&mut self, frame: &mut PlaybackFrame) {
        let input = *frame;
        let left = self.b0 * input.left + self.b1 * self.input1.left + self.b2 * self.input2.left
            - self.a1 * self.output1.left
            - self.a2 * self.output2.left;
        let right = self.b0 * input.right + self.b1 * self.input1.right + self.b2 * self.input2.right
            - self.a1 * self.output1.right
            - self.a2 * self.output2.right;

        self.input2 = self.input1;
        self.input1 = input;
        frame.set(left, right);
        self.output2 = self.output1;
        self.output1 = *frame;
    }

    pub fn clear(&mut self) {
        self.input1.clear();
        self.input2.clear();
        self.output1.clear();
        self.output2.clear();
    }
}

/// A biquad as a chain effect with `GainDb`, `Corner` and `Q` parameters.
pub struct BiQuadFilter {
    core: EffectCore,
    kind: BiQuadType,
    section: BiQuadSection,
}

impl BiQuadFilter {
    pub fn new(kind: BiQuadType, sample_rate: f32) -> Self {
        Self::with_parameters(kind, sample_rate, 0.0, 1000.0, std::f32::consts::FRAC_1_SQRT_2)
    }

    pub fn with_parameters(kind: BiQuadType, sample_rate: f32, gain_db: f32, corner: f32, q: f32) -> Self {
        let settings = EffectSettings::new(kind.name(), false)
            .with_parameter(Parameter::new("GainDb", gain_db, -24.0, 24.0))
            .with_parameter(Parameter::new("Corner", corner, 10.0, sample_rate * MAX_CORNER_RATIO))
            .with_parameter(Parameter::new("Q", q, 0.1, 10.0));

        let mut filter = Self {
            core: EffectCore::new(settings),
            kind,
            section: BiQuadSection::new(Coefficients::IDENTITY),
        };
        filter.initialize(sample_rate);
        filter
    }

    pub fn kind(&self) -> BiQuadType {
        self.kind
    }

    pub fn coefficients(&self) -> Coefficients {
        Coefficients::design(
            self.kind,
            self.core.value(GAIN_DB),
            self.core.value(CORNER),
            self.core.value(Q),
            self.core.sample_rate,
        )
    }
}

impl Effect for BiQuadFilter {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn initialize(&mut self, sample_rate: f32) {
        self.core.initialize(sample_rate);
        if let Some(corner) = self.core.settings.parameters.get_mut(CORNER) {
            corner.max = sample_rate * MAX_CORNER_RATIO;
        }
        self.section.set_coefficients(self.coefficients());
        self.section.clear();
    }

    #[inline]
    fn apply_to_frame(&mut self, frame: &mut PlaybackFrame, _t: f64) {
        self.section.process(frame);
    }

    fn has_output(&self, _t: f64) -> bool {
        true
    }

    fn clear(&mut self) {
        self.section.clear();
    }

    fn parameters_changed(&mut self) {
        self.section.set_coefficients(self.coefficients());
    }
}
