//! RIFF/WAVE container parsing
//!
//! Tracks are stored as little-endian RIFF containers. Only the header is parsed
//! up front: the scan locates the first `data` chunk and records where its payload
//! starts and how long it is declared to be. Sample data is then streamed from
//! that range block by block by the renderer.
//!
//! Format details:
//! - Preamble: `RIFF`, 4-byte total size (ignored), `WAVE`
//! - Chunks: 4-byte id, 4-byte little-endian size, body
//! - `fmt ` chunk: 16-byte canonical body, any trailing bytes skipped
//! - First `data` chunk ends the scan; later chunks are never read

pub mod riff;

use crate::{AmbientError, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

pub use riff::parse_header;

/// Byte stream a container can be parsed and streamed from
pub trait ByteSource: std::io::Read + std::io::Seek + Send {}

impl<T: std::io::Read + std::io::Seek + Send> ByteSource for T {}

/// WAVE format codes found in the `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FormatCode {
    /// Integer PCM
    Pcm = 0x0001,
    /// IEEE 754 floating point
    IeeeFloat = 0x0003,
    /// ITU G.711 A-law
    ALaw = 0x0006,
    /// ITU G.711 µ-law
    MuLaw = 0x0007,
    /// WAVE_FORMAT_EXTENSIBLE (sub-format GUID follows)
    Extensible = 0xFFFE,
}

impl FormatCode {
    /// Decode a raw format code, `None` for codes this crate does not know
    pub fn from_raw(code: u16) -> Option<Self> {
        FormatCode::from_u16(code)
    }
}

/// Fixed fields of the `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    /// Raw format code
    pub format_code: u16,
    /// Interleaved channel count
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
    /// Bytes per second
    pub byte_rate: u32,
    /// Bytes per frame
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl FormatChunk {
    /// Decoded format code
    pub fn format(&self) -> Option<FormatCode> {
        FormatCode::from_raw(self.format_code)
    }
}

/// Result of a header scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Format description, if a `fmt ` chunk preceded the payload
    pub format: Option<FormatChunk>,
    /// Absolute byte offset of the first payload byte
    pub payload_start: u64,
    /// Declared payload size in bytes
    pub payload_length: u32,
}

impl WavHeader {
    /// First byte past the declared payload
    pub fn payload_end(&self) -> u64 {
        self.payload_start + self.payload_length as u64
    }

    /// Check the header describes 16-bit mono integer PCM
    ///
    /// The renderer reads raw little-endian `i16` samples and duplicates them to
    /// both output channels, so anything else would be mis-rendered.
    pub fn ensure_renderable(&self) -> Result<()> {
        let fmt = self.format.ok_or_else(|| {
            AmbientError::MalformedContainer("payload chunk precedes format chunk".into())
        })?;

        match fmt.format() {
            Some(FormatCode::Pcm) => {}
            Some(other) => {
                return Err(AmbientError::UnsupportedFormat(format!(
                    "format {:?} is not integer PCM",
                    other
                )))
            }
            None => {
                return Err(AmbientError::UnsupportedFormat(format!(
                    "unknown format code 0x{:04X}",
                    fmt.format_code
                )))
            }
        }

        if fmt.bits_per_sample != 16 {
            return Err(AmbientError::UnsupportedFormat(format!(
                "{} bits per sample (expected 16)",
                fmt.bits_per_sample
            )));
        }
        if fmt.channels != 1 {
            return Err(AmbientError::UnsupportedFormat(format!(
                "{} channels (expected mono)",
                fmt.channels
            )));
        }
        Ok(())
    }
}
