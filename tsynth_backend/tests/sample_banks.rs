use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use tsynth_backend::rt_processing::waveform::WaveTableCache;
use tsynth_backend::samples::{self, DecodeError};
use tsynth_core::{OscillatorParameters, PlaybackFrame, SynthConfig, SynthError};

fn write_i16(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn write_f32(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// drums/{kick.wav, snare.wav, notes.txt}, keys/{pad.wav, broken.wav}, loose.wav
fn sound_banks() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let drums = dir.path().join("drums");
    let keys = dir.path().join("keys");
    fs::create_dir(&drums).unwrap();
    fs::create_dir(&keys).unwrap();

    write_i16(&drums.join("kick.wav"), 1, 22_050, &[0, 16_384, -16_384, 0]);
    write_f32(&drums.join("snare.wav"), 2, 44_100, &[0.25, -0.25, 0.5, -0.5]);
    fs::write(drums.join("notes.txt"), "not audio").unwrap();
    write_f32(&keys.join("pad.wav"), 1, 48_000, &[0.1; 64]);
    fs::write(keys.join("broken.wav"), b"RIFF garbage").unwrap();
    write_i16(&dir.path().join("loose.wav"), 1, 44_100, &[1, 2, 3]);
    dir
}

#[test]
fn scan_lists_samples_per_bank_in_order() {
    let dir = sound_banks();
    let found = samples::scan_sound_banks(dir.path()).unwrap();
    let names: Vec<(&str, &str)> = found.iter().map(|k| (k.bank.as_str(), k.name.as_str())).collect();
    assert_eq!(
        names,
        [("drums", "kick"), ("drums", "snare"), ("keys", "broken"), ("keys", "pad")]
    );
}

#[test]
fn scan_of_missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = samples::scan_sound_banks(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, SynthError::Io(_)));
}

#[test]
fn mono_is_duplicated_and_ints_are_normalised() {
    let dir = sound_banks();
    let decoded = samples::decode(&dir.path().join("drums/kick.wav")).unwrap();
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.sample_rate, 22_050);
    assert_eq!(decoded.frames.len(), 4);
    assert_eq!(decoded.frames[1], PlaybackFrame::mono(0.5));
    assert_eq!(decoded.frames[2], PlaybackFrame::mono(-0.5));
}

#[test]
fn stereo_frames_keep_their_channels() {
    let dir = sound_banks();
    let decoded = samples::decode(&dir.path().join("drums/snare.wav")).unwrap();
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.frames, [PlaybackFrame::new(0.25, -0.25), PlaybackFrame::new(0.5, -0.5)]);
}

#[test]
fn garbage_file_fails_to_decode() {
    let dir = sound_banks();
    let err = samples::decode(&dir.path().join("keys/broken.wav")).unwrap_err();
    assert!(matches!(err, DecodeError::Wav(_)));
}

#[test]
fn cache_browses_and_loads_samples() {
    let dir = sound_banks();
    let config = SynthConfig {
        sound_bank_dir: Some(dir.path().to_path_buf()),
        ..SynthConfig::default()
    };
    let cache = WaveTableCache::from_config(&config).unwrap();
    assert_eq!(cache.sound_banks(), ["drums", "keys"]);
    assert_eq!(cache.sound_names("drums"), ["kick", "snare"]);
    assert!(cache.sound_names("strings").is_empty());

    let table = cache.get(&OscillatorParameters::sample("keys", "pad"), 60).unwrap();
    assert_eq!(table.len(), 64);
    assert_eq!(table.native_sample_rate(), 48_000.0);
    assert_eq!(table.fundamental(), None);

    // every note shares the one decoded table
    let again = cache.get(&OscillatorParameters::sample("keys", "pad"), 72).unwrap();
    assert!(std::sync::Arc::ptr_eq(&table, &again));
}

#[test]
fn preload_skips_undecodable_samples() {
    let dir = sound_banks();
    let mut cache = WaveTableCache::new(44_100.0, 4, 21, 108);
    assert_eq!(cache.load_sound_banks(dir.path()).unwrap(), 4);

    assert_eq!(cache.preload_samples(), 3);
    assert_eq!(cache.cached_samples(), 3);

    let err = cache.get(&OscillatorParameters::sample("keys", "broken"), 60).unwrap_err();
    assert!(matches!(err, SynthError::Decode { .. }));
    let err = cache.get(&OscillatorParameters::sample("keys", "organ"), 60).unwrap_err();
    assert!(matches!(err, SynthError::SampleNotFound { .. }));
}
