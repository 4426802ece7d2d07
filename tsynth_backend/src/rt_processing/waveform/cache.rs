use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use tsynth_core::midi::midi_frequency;
use tsynth_core::{BuiltinShape, OscillatorParameters, Result, SourceKind, SynthConfig, SynthError};

use crate::rt_processing::waveform::tables::WaveTable;
use crate::samples::{self, SampleKey};

/// Memo key for a rendered oscillator table.
///
/// The signal range is part of the key so two templates that differ only in
/// amplitude never share a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OscillatorKey {
    midi_number: u8,
    shape: BuiltinShape,
    low_bits: u32,
    high_bits: u32,
}

impl OscillatorKey {
    fn new(params: &OscillatorParameters, midi_number: u8) -> Self {
        Self {
            midi_number,
            shape: params.builtin_shape,
            low_bits: params.signal_low.to_bits(),
            high_bits: params.signal_high.to_bits(),
        }
    }
}

type SampleId = (String, String);

/// Lazily built, shared wave tables.
///
/// Oscillator keys are enumerated up front for every note in the MIDI range
/// and every built-in shape; tables are only rendered on first use. Sample
/// files are discovered once and decoded on first use. Tables are never
/// mutated after insertion, so voices read them without any lock.
///
/// Building happens through [`get`](Self::get) and [`prewarm`](Self::prewarm)
/// on the control side. The render thread only calls
/// [`get_cached`](Self::get_cached).
pub struct WaveTableCache {
    render_sample_rate: f32,
    oversample: usize,
    midi_low: u8,
    midi_high: u8,
    sample_root_note: u8,
    registered: HashSet<(u8, BuiltinShape)>,
    oscillators: RwLock<HashMap<OscillatorKey, Arc<WaveTable>>>,
    sample_files: BTreeMap<SampleId, SampleKey>,
    // bank, then sample name, so lookups work on borrowed strings
    samples: RwLock<HashMap<String, HashMap<String, Arc<WaveTable>>>>,
}

impl WaveTableCache {
    pub fn new(render_sample_rate: f32, oversample: usize, midi_low: u8, midi_high: u8) -> Self {
        let registered = (midi_low..=midi_high)
            .flat_map(|midi| BuiltinShape::ALL.into_iter().map(move |shape| (midi, shape)))
            .collect();

        Self {
            render_sample_rate,
            oversample: oversample.max(1),
            midi_low,
            midi_high,
            sample_root_note: 60,
            registered,
            oscillators: RwLock::new(HashMap::new()),
            sample_files: BTreeMap::new(),
            samples: RwLock::new(HashMap::new()),
        }
    }

    /// Builds the cache for a validated config and scans its sound-bank directory, if any.
    pub fn from_config(config: &SynthConfig) -> Result<Self> {
        let mut cache = Self::new(config.sample_rate, config.oversample, config.midi_low, config.midi_high);
        cache.sample_root_note = config.sample_root_note;
        if let Some(dir) = &config.sound_bank_dir {
            cache.load_sound_banks(dir)?;
        }
        Ok(cache)
    }

    /// Registers every sample file found under `dir`. Nothing is decoded yet.
    pub fn load_sound_banks(&mut self, dir: &Path) -> Result<usize> {
        let found = samples::scan_sound_banks(dir)?;
        let count = found.len();
        for key in found {
            self.sample_files.insert((key.bank.clone(), key.name.clone()), key);
        }
        info!(dir = %dir.display(), samples = count, banks = self.sound_banks().len(), "sound banks loaded");
        Ok(count)
    }

    pub fn render_sample_rate(&self) -> f32 {
        self.render_sample_rate
    }

    pub fn sample_root_note(&self) -> u8 {
        self.sample_root_note
    }

    pub fn midi_range(&self) -> (u8, u8) {
        (self.midi_low, self.midi_high)
    }

    /// Table for `params` played at `midi_number`, built on first request.
    pub fn get(&self, params: &OscillatorParameters, midi_number: u8) -> Result<Arc<WaveTable>> {
        match params.source_kind {
            SourceKind::Builtin => self.oscillator(params, midi_number),
            SourceKind::SampleBased => self.sample(&params.instrument_bank, &params.instrument_name),
        }
    }

    /// Table for `params` at `midi_number` if it was already built. Never
    /// renders, decodes or allocates.
    ///
    /// A registered table that is still cold fails with `TableNotBuilt`.
    pub fn get_cached(&self, params: &OscillatorParameters, midi_number: u8) -> Result<Arc<WaveTable>> {
        let table = match params.source_kind {
            SourceKind::Builtin => {
                self.check_registered(params, midi_number)?;
                let key = OscillatorKey::new(params, midi_number);
                self.oscillators.read().get(&key).cloned()
            }
            SourceKind::SampleBased => self.cached_sample(&params.instrument_bank, &params.instrument_name),
        };
        table.ok_or(SynthError::TableNotBuilt { midi_number })
    }

    fn check_registered(&self, params: &OscillatorParameters, midi_number: u8) -> Result<()> {
        if self.registered.contains(&(midi_number, params.builtin_shape)) {
            Ok(())
        } else {
            Err(SynthError::OscillatorNotFound {
                midi_number,
                shape: params.builtin_shape,
            })
        }
    }

    fn cached_sample(&self, bank: &str, name: &str) -> Option<Arc<WaveTable>> {
        self.samples.read().get(bank).and_then(|names| names.get(name)).cloned()
    }

    fn oscillator(&self, params: &OscillatorParameters, midi_number: u8) -> Result<Arc<WaveTable>> {
        self.check_registered(params, midi_number)?;

        let key = OscillatorKey::new(params, midi_number);
        if let Some(table) = self.oscillators.read().get(&key) {
            return Ok(Arc::clone(table));
        }

        // rendered outside the lock; a racing builder loses and its table is dropped
        let table = Arc::new(WaveTable::oscillator(
            params.builtin_shape,
            midi_frequency(midi_number),
            params.signal_low,
            params.signal_high,
            self.render_sample_rate,
            self.oversample,
            midi_number as u32 + 1,
        ));

        let mut memo = self.oscillators.write();
        Ok(Arc::clone(memo.entry(key).or_insert(table)))
    }

    fn sample(&self, bank: &str, name: &str) -> Result<Arc<WaveTable>> {
        let id = (bank.to_string(), name.to_string());
        let Some(file) = self.sample_files.get(&id) else {
            return Err(SynthError::SampleNotFound {
                bank: bank.to_string(),
                sample: name.to_string(),
            });
        };

        if let Some(table) = self.cached_sample(bank, name) {
            return Ok(table);
        }

        let decoded = samples::decode(&file.path).map_err(|err| err.at(&file.path))?;
        debug!(
            bank,
            sample = name,
            frames = decoded.frames.len(),
            rate = decoded.sample_rate,
            channels = decoded.channels,
            "sample decoded"
        );
        let table = Arc::new(WaveTable::from_frames(
            decoded.frames,
            decoded.sample_rate as f32,
            self.render_sample_rate,
        ));

        let mut memo = self.samples.write();
        let (bank, name) = id;
        Ok(Arc::clone(memo.entry(bank).or_default().entry(name).or_insert(table)))
    }

    /// Builds every table `params` can ask for across the MIDI range.
    ///
    /// The control thread runs this before a new oscillator becomes visible
    /// to the render thread.
    pub fn prewarm(&self, params: &OscillatorParameters) -> Result<usize> {
        let built = match params.source_kind {
            SourceKind::Builtin => {
                for midi in self.midi_low..=self.midi_high {
                    self.oscillator(params, midi)?;
                }
                (self.midi_high - self.midi_low) as usize + 1
            }
            SourceKind::SampleBased => {
                self.sample(&params.instrument_bank, &params.instrument_name)?;
                1
            }
        };
        debug!(shape = params.builtin_shape.name(), kind = ?params.source_kind, tables = built, "wave tables prewarmed");
        Ok(built)
    }

    /// Decodes every discovered sample. Files that fail are skipped and logged.
    pub fn preload_samples(&self) -> usize {
        let mut loaded = 0;
        for (bank, name) in self.sample_files.keys() {
            match self.sample(bank, name) {
                Ok(_) => loaded += 1,
                Err(err) => warn!(bank = %bank, sample = %name, error = %err, "skipping sample"),
            }
        }
        loaded
    }

    /// Bank names in sorted order.
    pub fn sound_banks(&self) -> Vec<String> {
        let mut banks: Vec<String> = self.sample_files.keys().map(|(bank, _)| bank.clone()).collect();
        banks.dedup();
        banks
    }

    /// Sample names inside `bank`, sorted.
    pub fn sound_names(&self, bank: &str) -> Vec<String> {
        self.sample_files
            .keys()
            .filter(|(b, _)| b == bank)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn cached_oscillators(&self) -> usize {
        self.oscillators.read().len()
    }

    pub fn cached_samples(&self) -> usize {
        self.samples.read().values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> WaveTableCache {
        WaveTableCache::new(8_000.0, 2, 60, 64)
    }

    #[test]
    fn test_tables_are_built_lazily_and_shared() {
        let cache = cache();
        assert_eq!(cache.cached_oscillators(), 0);

        let params = OscillatorParameters::builtin(BuiltinShape::Square);
        let first = cache.get(&params, 62).unwrap();
        let second = cache.get(&params, 62).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_oscillators(), 1);
        assert_eq!(first.fundamental(), Some(midi_frequency(62)));
    }

    #[test]
    fn test_note_outside_range_is_not_found() {
        let cache = cache();
        let params = OscillatorParameters::builtin(BuiltinShape::Sine);
        let err = cache.get(&params, 65).unwrap_err();
        assert!(matches!(err, SynthError::OscillatorNotFound { midi_number: 65, .. }));
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_signal_range_is_part_of_the_key() {
        let cache = cache();
        let full = OscillatorParameters::builtin(BuiltinShape::Sawtooth);
        let half = OscillatorParameters {
            signal_low: -0.5,
            signal_high: 0.5,
            ..full.clone()
        };

        let a = cache.get(&full, 60).unwrap();
        let b = cache.get(&half, 60).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.frames()[0].left, -1.0);
        assert_eq!(b.frames()[0].left, -0.5);
    }

    #[test]
    fn test_cached_lookup_never_builds() {
        let cache = cache();
        let params = OscillatorParameters::builtin(BuiltinShape::Square);
        let err = cache.get_cached(&params, 61).unwrap_err();
        assert!(matches!(err, SynthError::TableNotBuilt { midi_number: 61 }));
        assert!(!err.is_configuration_fault());
        assert_eq!(cache.cached_oscillators(), 0);

        let built = cache.get(&params, 61).unwrap();
        assert!(Arc::ptr_eq(&cache.get_cached(&params, 61).unwrap(), &built));

        // a different amplitude is a different, still cold table
        let quiet = OscillatorParameters {
            signal_low: -0.5,
            signal_high: 0.5,
            ..params.clone()
        };
        assert!(cache.get_cached(&quiet, 61).is_err());
        assert!(cache.get_cached(&params, 65).unwrap_err().is_configuration_fault());
        assert!(cache.get_cached(&OscillatorParameters::sample("drums", "kick"), 60).is_err());
        assert_eq!(cache.cached_oscillators(), 1);
        assert_eq!(cache.cached_samples(), 0);
    }

    #[test]
    fn test_prewarm_covers_the_range() {
        let cache = cache();
        let built = cache.prewarm(&OscillatorParameters::builtin(BuiltinShape::Triangle)).unwrap();
        assert_eq!(built, 5);
        assert_eq!(cache.cached_oscillators(), 5);
    }

    #[test]
    fn test_unknown_sample_is_not_found() {
        let cache = cache();
        let err = cache.get(&OscillatorParameters::sample("drums", "kick"), 60).unwrap_err();
        assert!(matches!(err, SynthError::SampleNotFound { .. }));
        assert!(cache.sound_banks().is_empty());
        assert!(cache.sound_names("drums").is_empty());
    }
}
