//! WAV file sink

use crate::mixer::{CycleOutcome, Renderer};
use crate::sink::{SampleSink, StereoFrame};
use crate::storage::Storage;
use crate::{AmbientError, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Sink that writes 16-bit stereo frames to a WAV file
///
/// A WAV header carries a single sample rate, so the rate in effect when the
/// file was created is kept. Later pitch changes are recorded and reported but
/// do not alter the file.
///
/// # Examples
///
/// ```no_run
/// use ambient_mixer::export::WavSink;
/// use ambient_mixer::sink::SampleSink;
///
/// # fn main() -> ambient_mixer::Result<()> {
/// let mut sink = WavSink::create("out.wav", 11025)?;
/// sink.write_frames(&[[0, 0]; 64])?;
/// sink.finalize()?;
/// # Ok(())
/// # }
/// ```
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    requested_rate: u32,
    frames_written: u64,
}

impl WavSink {
    /// Create `path` as a stereo 16-bit WAV file at `sample_rate`
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path.as_ref(), spec).map_err(|e| {
            AmbientError::AudioFileError(format!(
                "Failed to create '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(WavSink {
            writer,
            sample_rate,
            requested_rate: sample_rate,
            frames_written: 0,
        })
    }

    /// Sample rate in the file header
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Most recent rate requested by the renderer
    pub fn requested_rate(&self) -> u32 {
        self.requested_rate
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Patch the header and flush the file
    pub fn finalize(self) -> Result<u64> {
        let frames = self.frames_written;
        self.writer
            .finalize()
            .map_err(|e| AmbientError::AudioFileError(format!("Failed to finalize WAV file: {e}")))?;
        Ok(frames)
    }
}

impl SampleSink for WavSink {
    fn write_frames(&mut self, frames: &[StereoFrame]) -> Result<()> {
        for frame in frames {
            for &sample in frame {
                self.writer.write_sample(sample).map_err(|e| {
                    AmbientError::AudioFileError(format!("Failed to write sample: {e}"))
                })?;
            }
        }
        self.frames_written += frames.len() as u64;
        Ok(())
    }

    fn set_frame_rate(&mut self, rate: u32) -> Result<()> {
        if rate != self.sample_rate {
            log::debug!(
                "WAV export stays at {} Hz (pitch requested {} Hz)",
                self.sample_rate,
                rate
            );
        }
        self.requested_rate = rate;
        Ok(())
    }
}

/// Render at least `frames` frames into `path`
///
/// Skipped cycles are retried up to `max_skips` times in a row before giving up,
/// since a track that keeps returning no data would otherwise never finish.
pub fn render_to_wav<S: Storage, P: AsRef<Path>>(
    renderer: &mut Renderer<S>,
    path: P,
    sample_rate: u32,
    frames: u64,
    max_skips: u32,
) -> Result<u64> {
    let mut sink = WavSink::create(path.as_ref(), sample_rate)?;
    log::info!(
        "Rendering {} frames ({:.1}s) to {}",
        frames,
        frames as f64 / sample_rate as f64,
        path.as_ref().display()
    );

    let mut skips = 0;
    while sink.frames_written() < frames {
        match renderer.render_cycle(&mut sink)? {
            CycleOutcome::Rendered { .. } => skips = 0,
            CycleOutcome::Skipped => {
                skips += 1;
                if skips >= max_skips {
                    return Err(AmbientError::Other(format!(
                        "{max_skips} consecutive cycles produced no data"
                    )));
                }
            }
        }
    }

    let written = sink.finalize()?;
    log::info!("Export complete: {} frames", written);
    Ok(written)
}
