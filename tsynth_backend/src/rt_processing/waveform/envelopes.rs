use tsynth_core::EnvelopeSettings;

/// ADSR envelope states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Time-driven ADSR envelope.
///
/// Every stage is a linear ramp between its endpoints, addressed by the
/// elapsed stream time since the stage began. Sustain holds until
/// [`Envelope::disengage`]; release ramps down from whatever level was
/// current at that moment.
#[derive(Debug, Clone)]
pub struct Envelope {
    settings: EnvelopeSettings,

    // Current state
    state: EnvelopeState,
    phase_start_time: f64,
    level_at_transition: f32,
}

impl Envelope {
    pub fn new(settings: EnvelopeSettings) -> Self {
        Self {
            settings,
            state: EnvelopeState::Idle,
            phase_start_time: 0.0,
            level_at_transition: 0.0,
        }
    }

    /// Note on. Re-triggers from the start of the attack if already running.
    pub fn engage(&mut self, t: f64) {
        self.state = EnvelopeState::Attack;
        self.phase_start_time = t;
        self.level_at_transition = 0.0;
    }

    /// Note off. Release starts from the level at `t`.
    pub fn disengage(&mut self, t: f64) {
        self.level_at_transition = self.level(t);
        self.phase_start_time = t;
        self.state = EnvelopeState::Release;
    }

    /// Envelope level at `t`, advancing through any stages that have elapsed.
    pub fn level(&mut self, t: f64) -> f32 {
        let s = self.settings;
        loop {
            let elapsed = (t - self.phase_start_time).max(0.0);
            match self.state {
                EnvelopeState::Idle => return 0.0,

                EnvelopeState::Attack => {
                    let duration = s.attack_s.max(0.0) as f64;
                    if elapsed >= duration {
                        self.advance(EnvelopeState::Decay, duration);
                        continue;
                    }
                    return lerp(0.0, s.attack_peak, elapsed / duration);
                }

                EnvelopeState::Decay => {
                    let duration = s.decay_s.max(0.0) as f64;
                    if elapsed >= duration {
                        self.advance(EnvelopeState::Sustain, duration);
                        continue;
                    }
                    return lerp(s.attack_peak, s.sustain_peak, elapsed / duration);
                }

                // Stay in sustain until note off
                EnvelopeState::Sustain => return s.sustain_peak,

                EnvelopeState::Release => {
                    let duration = s.release_s.max(0.0) as f64;
                    if elapsed >= duration {
                        self.state = EnvelopeState::Idle;
                        return 0.0;
                    }
                    return lerp(self.level_at_transition, 0.0, elapsed / duration);
                }
            }
        }
    }

    /// True while the envelope can still produce a non-zero level at `t`.
    pub fn has_output(&self, t: f64) -> bool {
        match self.state {
            EnvelopeState::Idle => false,
            EnvelopeState::Release => t < self.phase_start_time + self.settings.release_s.max(0.0) as f64,
            _ => true,
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn settings(&self) -> &EnvelopeSettings {
        &self.settings
    }

    /// Reset envelope to idle state
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.phase_start_time = 0.0;
        self.level_at_transition = 0.0;
    }

    fn advance(&mut self, next: EnvelopeState, elapsed_stage: f64) {
        self.state = next;
        self.phase_start_time += elapsed_stage;
    }
}

#[inline]
fn lerp(from: f32, to: f32, progress: f64) -> f32 {
    let p = progress.clamp(0.0, 1.0) as f32;
    from + (to - from) * p
}
