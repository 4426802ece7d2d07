pub const MIDI_PIANO_LOW: u8 = 21;
pub const MIDI_PIANO_HIGH: u8 = 108;
pub const MIDI_MAX: u8 = 127;

/// Default bounds of a generated signal.
pub const SIGNAL_LOW: f32 = -1.0;
pub const SIGNAL_HIGH: f32 = 1.0;

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
#[inline]
pub fn midi_frequency(midi_number: u8) -> f32 {
    440.0 * 2f32.powf((midi_number as f32 - 69.0) / 12.0)
}

/// Frequency ratio between two notes, `2^((note - root) / 12)`.
#[inline]
pub fn semitone_ratio(midi_number: u8, root: u8) -> f32 {
    2f32.powf((midi_number as f32 - root as f32) / 12.0)
}
