//! Polyphonic voice scheduling.
//!
//! A note-on builds a [`Voice`] around an already built wave table and keeps
//! it in the engaged map while the key is held. Note-off moves it to the
//! disengaged list, where it rings out until its envelope goes idle.

use std::collections::HashMap;
use std::sync::Arc;

use tsynth_core::midi::semitone_ratio;
use tsynth_core::{OscillatorParameters, PlaybackFrame, Result, SynthError, TableReadout};

use crate::rt_processing::routing::Pan;
use crate::rt_processing::waveform::{Envelope, WaveTable, WaveTableCache};

/// Ring-out slots reserved per unit of polyphony.
const DISENGAGED_RESERVE: usize = 4;

/// One sounding note.
pub struct Voice {
    midi_number: u8,
    params: Arc<OscillatorParameters>,
    table: Arc<WaveTable>,
    envelope: Envelope,
    readout: TableReadout,
    position: f64,
    increment: f64,
}

impl Voice {
    /// `sample_root_note` is the note a sample table plays back unshifted at.
    pub fn new(
        midi_number: u8,
        params: Arc<OscillatorParameters>,
        table: Arc<WaveTable>,
        readout: TableReadout,
        sample_root_note: u8,
    ) -> Self {
        let pitch = match table.fundamental() {
            Some(_) => 1.0,
            None => semitone_ratio(midi_number, sample_root_note) as f64,
        };

        Self {
            midi_number,
            envelope: Envelope::new(params.envelope),
            increment: table.phase_increment() * pitch,
            position: 0.0,
            params,
            table,
            readout,
        }
    }

    pub fn midi_number(&self) -> u8 {
        self.midi_number
    }

    pub fn params(&self) -> &OscillatorParameters {
        &self.params
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn engage(&mut self, t: f64) {
        self.position = 0.0;
        self.envelope.engage(t);
    }

    pub fn disengage(&mut self, t: f64) {
        self.envelope.disengage(t);
    }

    pub fn has_output(&self, t: f64) -> bool {
        self.envelope.has_output(t)
    }

    /// Adds this voice's enveloped sample at `t` into `frame`.
    #[inline]
    pub fn add_sample(&mut self, t: f64, frame: &mut PlaybackFrame) {
        let level = self.envelope.level(t);
        let sample = match self.readout {
            TableReadout::Phase => {
                let sample = self.table.frame_at(self.position);
                self.position = self.table.wrap(self.position + self.increment);
                sample
            }
            TableReadout::AbsoluteTime => self.table.frame_at_time(t),
        };
        *frame += sample * level;
    }
}

/// Engaged voices keyed by note plus the ring-out list.
pub struct VoiceMap {
    capacity: usize,
    engaged: HashMap<u8, Voice>,
    disengaged: Vec<Voice>,
    cache: Arc<WaveTableCache>,
    template: Arc<OscillatorParameters>,
    readout: TableReadout,
}

impl VoiceMap {
    pub fn new(capacity: usize, cache: Arc<WaveTableCache>, readout: TableReadout) -> Self {
        Self {
            capacity,
            engaged: HashMap::with_capacity(capacity),
            disengaged: Vec::with_capacity(capacity * DISENGAGED_RESERVE),
            cache,
            template: Arc::new(OscillatorParameters::default()),
            readout,
        }
    }

    /// Template copied into every voice engaged from now on.
    pub fn set_template(&mut self, template: Arc<OscillatorParameters>) {
        self.template = template;
    }

    pub fn template(&self) -> &OscillatorParameters {
        &self.template
    }

    pub fn shared_template(&self) -> &Arc<OscillatorParameters> {
        &self.template
    }

    pub fn cache(&self) -> &Arc<WaveTableCache> {
        &self.cache
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn engaged_count(&self) -> usize {
        self.engaged.len()
    }

    pub fn disengaged_count(&self) -> usize {
        self.disengaged.len()
    }

    pub fn is_engaged(&self, midi_number: u8) -> bool {
        self.engaged.contains_key(&midi_number)
    }

    pub fn engaged_voice(&self, midi_number: u8) -> Option<&Voice> {
        self.engaged.get(&midi_number)
    }

    /// Note-on or note-off at stream time `t`.
    ///
    /// Pressing an engaged note and releasing an idle one are no-ops. A press
    /// with every slot taken fails with `CapacityExceeded`; nothing is stolen.
    /// A press whose table was never prewarmed fails with `TableNotBuilt`.
    pub fn set_note(&mut self, midi_number: u8, pressed: bool, t: f64) -> Result<()> {
        if pressed {
            if self.engaged.contains_key(&midi_number) {
                return Ok(());
            }
            if self.engaged.len() >= self.capacity {
                return Err(SynthError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }

            let table = self.cache.get_cached(&self.template, midi_number)?;
            let mut voice = Voice::new(
                midi_number,
                Arc::clone(&self.template),
                table,
                self.readout,
                self.cache.sample_root_note(),
            );
            voice.engage(t);
            self.engaged.insert(midi_number, voice);
        } else if let Some(mut voice) = self.engaged.remove(&midi_number) {
            voice.disengage(t);
            self.disengaged.push(voice);
        }
        Ok(())
    }

    /// Releases every held note.
    pub fn release_all(&mut self, t: f64) {
        for (_, mut voice) in self.engaged.drain() {
            voice.disengage(t);
            self.disengaged.push(voice);
        }
    }

    /// Mixes every live voice at `t` into `frame` through `pan`.
    ///
    /// Voices that finished ringing out are dropped here and nowhere else.
    /// Returns true while any voice is left in either collection.
    #[inline]
    pub fn render_frame(&mut self, t: f64, pan: &Pan, frame: &mut PlaybackFrame) -> bool {
        self.disengaged.retain(|voice| voice.has_output(t));

        let mut mix = PlaybackFrame::SILENCE;
        for voice in self.engaged.values_mut() {
            voice.add_sample(t, &mut mix);
        }
        for voice in self.disengaged.iter_mut() {
            voice.add_sample(t, &mut mix);
        }

        *frame = pan.apply(mix);
        !self.engaged.is_empty() || !self.disengaged.is_empty()
    }
}
