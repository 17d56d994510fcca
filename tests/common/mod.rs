#![allow(dead_code)]

use ambient_mixer::{EngineConfig, MemoryStorage, TrackConfig};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

pub fn mono_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: 11025,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// 16-bit mono WAV file contents
pub fn wav_bytes(samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, mono_spec()).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Write a 16-bit mono WAV file to `path`
pub fn write_wav(path: &Path, samples: &[i16]) {
    let mut writer = WavWriter::create(path, mono_spec()).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Offset of the payload length field in a `wav_bytes` blob
pub fn data_size_offset(bytes: &[u8]) -> usize {
    bytes.windows(4).position(|w| w == b"data").unwrap() + 4
}

/// One track per entry, each with the given sounds, unity volume
pub fn config(tracks: &[(&str, &[&str])]) -> EngineConfig {
    let mut config = EngineConfig::reference();
    config.tracks = tracks
        .iter()
        .map(|(name, sounds)| {
            let mut t = TrackConfig::new(name, sounds);
            t.volume = 1.0;
            t.filter = 0.5;
            t
        })
        .collect();
    config
}

pub fn storage(files: &[(&str, Vec<u8>)]) -> MemoryStorage {
    files
        .iter()
        .fold(MemoryStorage::new(), |s, (name, bytes)| s.with_file(name, bytes.clone()))
}
