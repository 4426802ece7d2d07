//! Sound-bank discovery and sample decoding.
//!
//! A sound-bank directory holds one sub-directory per bank; every audio file
//! inside is a sample named after its file stem. Everything here runs on the
//! control thread.

use std::fs;
use std::path::{Path, PathBuf};

use dasp::Sample;
use dasp::sample::I24;
use hound::{SampleFormat, WavReader};
use thiserror::Error;
use tracing::{debug, warn};

use tsynth_core::{PlaybackFrame, SynthError};

/// Extensions accepted during the bank scan.
pub const SAMPLE_EXTENSIONS: [&str; 3] = ["wav", "aif", "aiff"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),

    #[error("file contains no audio frames")]
    Empty,
}

impl DecodeError {
    pub fn at(self, path: &Path) -> SynthError {
        SynthError::Decode {
            path: path.to_path_buf(),
            reason: self.to_string(),
        }
    }
}

/// One discovered sample file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleKey {
    pub bank: String,
    pub name: String,
    pub path: PathBuf,
}

/// PCM frames plus the format they were recorded in.
#[derive(Debug, Clone)]
pub struct DecodedSample {
    pub frames: Vec<PlaybackFrame>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Lists every sample under `root`, sorted by bank then name.
///
/// Files with other extensions are ignored. Unreadable bank directories are
/// skipped with a warning; an unreadable root is an error.
pub fn scan_sound_banks(root: &Path) -> Result<Vec<SampleKey>, SynthError> {
    let mut keys = Vec::new();

    for bank_entry in fs::read_dir(root)? {
        let bank_path = bank_entry?.path();
        if !bank_path.is_dir() {
            continue;
        }
        let Some(bank) = file_name(&bank_path) else {
            continue;
        };

        let files = match fs::read_dir(&bank_path) {
            Ok(files) => files,
            Err(err) => {
                warn!(bank = %bank, error = %err, "skipping unreadable sound bank");
                continue;
            }
        };

        for file in files.flatten() {
            let path = file.path();
            if !path.is_file() || !has_sample_extension(&path) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(SampleKey {
                    bank: bank.clone(),
                    name: name.to_string(),
                    path: path.clone(),
                });
            }
        }
    }

    keys.sort_by(|a, b| (&a.bank, &a.name).cmp(&(&b.bank, &b.name)));
    debug!(root = %root.display(), samples = keys.len(), "sound banks scanned");
    Ok(keys)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|s| s.to_str()).map(str::to_string)
}

fn has_sample_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SAMPLE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// Decodes a sample file to stereo frames. Mono is duplicated to both channels.
pub fn decode(path: &Path) -> Result<DecodedSample, DecodeError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !extension.eq_ignore_ascii_case("wav") {
        return Err(DecodeError::UnsupportedFormat(format!("'.{extension}' files cannot be decoded")));
    }

    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels;
    if !(1..=2).contains(&channels) {
        return Err(DecodeError::UnsupportedChannels(channels));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| v.to_sample::<f32>()))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v.to_sample::<f32>()))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| I24::new(v).map(|v| v.to_sample::<f32>()).unwrap_or(0.0)))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v.to_sample::<f32>()))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(DecodeError::UnsupportedFormat(format!("{format:?} at {bits} bits")));
        }
    };

    let frames: Vec<PlaybackFrame> = match channels {
        1 => samples.iter().map(|&s| PlaybackFrame::mono(s)).collect(),
        _ => samples
            .chunks_exact(2)
            .map(|pair| PlaybackFrame::new(pair[0], pair[1]))
            .collect(),
    };

    if frames.is_empty() {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedSample {
        frames,
        sample_rate: spec.sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(has_sample_extension(Path::new("a/b/kick.wav")));
        assert!(has_sample_extension(Path::new("a/b/pad.AIFF")));
        assert!(has_sample_extension(Path::new("a/b/pad.aif")));
        assert!(!has_sample_extension(Path::new("a/b/notes.txt")));
        assert!(!has_sample_extension(Path::new("a/b/noext")));
    }

    #[test]
    fn test_aiff_is_reported_unsupported() {
        let err = decode(Path::new("bank/pad.aiff")).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));

        let synth_err = err.at(Path::new("bank/pad.aiff"));
        assert!(matches!(synth_err, SynthError::Decode { .. }));
    }
}
