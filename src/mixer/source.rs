//! Streaming track source
//!
//! Holds an open handle, the validated payload range and the read cursor for one
//! track. Reads never move the cursor by themselves: the renderer commits the
//! advance only once every track has produced a block, which keeps a failed
//! cycle free of side effects.

use crate::container::{parse_header, ByteSource, WavHeader};
use crate::storage::Storage;
use crate::Result;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Bytes per sample (16-bit mono)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Open sound with its payload range and cursor
#[derive(Debug)]
pub struct TrackSource<R: ByteSource> {
    reader: R,
    header: WavHeader,
    cursor: u64,
    name: String,
}

impl<R: ByteSource> TrackSource<R> {
    /// Open `name`, parse its header and place the cursor at the payload start
    ///
    /// # Errors
    ///
    /// `OpenFailed` from the storage backend, `MalformedContainer` or
    /// `UnsupportedFormat` from the header.
    pub fn open<S>(storage: &S, name: &str) -> Result<Self>
    where
        S: Storage<Reader = R> + ?Sized,
    {
        let mut reader = storage.open(name)?;
        let header = parse_header(&mut reader)?;
        header.ensure_renderable()?;
        log::debug!(
            "Opened '{}': payload {} bytes at offset {}",
            name,
            header.payload_length,
            header.payload_start
        );
        Ok(TrackSource {
            reader,
            cursor: header.payload_start,
            header,
            name: name.to_string(),
        })
    }

    /// Sound identifier this source was opened from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed header
    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Absolute byte offset of the next read
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Read up to `out.len()` samples at the cursor without advancing it
    ///
    /// `scratch` must hold at least `out.len() * 2` bytes. Returns the number of
    /// whole samples read; zero means end of stream.
    pub fn read_block(&mut self, out: &mut [i16], scratch: &mut [u8]) -> Result<usize> {
        let want = out.len() * BYTES_PER_SAMPLE;
        let bytes = &mut scratch[..want];

        self.reader.seek(SeekFrom::Start(self.cursor))?;
        let mut filled = 0;
        while filled < want {
            match self.reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let samples = filled / BYTES_PER_SAMPLE;
        for (dst, src) in out.iter_mut().zip(bytes[..samples * BYTES_PER_SAMPLE].chunks_exact(2)) {
            *dst = i16::from_le_bytes([src[0], src[1]]);
        }
        Ok(samples)
    }

    /// Commit `samples` consumed samples
    pub fn advance(&mut self, samples: usize) {
        self.cursor += (samples * BYTES_PER_SAMPLE) as u64;
    }

    /// Cursor position at which the source loops back to the payload start
    pub fn loop_threshold(&self, guard_bytes: u32) -> u64 {
        self.header.payload_start + self.header.payload_length.saturating_sub(guard_bytes) as u64
    }

    /// Loop back to the payload start once inside the guard band
    ///
    /// Returns true when the cursor was reset.
    pub fn wrap_if_needed(&mut self, guard_bytes: u32) -> bool {
        if self.cursor >= self.loop_threshold(guard_bytes) {
            self.cursor = self.header.payload_start;
            true
        } else {
            false
        }
    }
}
