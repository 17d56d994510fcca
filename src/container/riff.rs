//! RIFF chunk scanner
//!
//! Reads the container preamble and walks chunk headers until the first payload
//! chunk. Fixed-layout fields are decoded with `nom`; the stream itself is only
//! ever read forward or skipped with relative seeks.

use super::{ByteSource, FormatChunk, WavHeader};
use crate::{AmbientError, Result};
use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32};
use nom::sequence::tuple;
use nom::IResult;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Container tag at offset 0
pub const RIFF_TAG: &[u8; 4] = b"RIFF";
/// Format tag at offset 8
pub const WAVE_TAG: &[u8; 4] = b"WAVE";
/// Format-description chunk id
pub const FMT_ID: &[u8; 4] = b"fmt ";
/// Payload chunk id
pub const DATA_ID: &[u8; 4] = b"data";

const PREAMBLE_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_CANONICAL_LEN: u32 = 16;

/// Chunk header: id and declared body size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

fn container_tag(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&RIFF_TAG[..])(input)
}

fn format_tag(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&WAVE_TAG[..])(input)
}

fn chunk_header(input: &[u8]) -> IResult<&[u8], ChunkHeader> {
    let (input, (id, size)) = tuple((take(4usize), le_u32))(input)?;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(id);
    Ok((input, ChunkHeader { id: raw, size }))
}

fn format_body(input: &[u8]) -> IResult<&[u8], FormatChunk> {
    let (input, (format_code, channels, sample_rate, byte_rate, block_align, bits_per_sample)) =
        tuple((le_u16, le_u16, le_u32, le_u32, le_u16, le_u16))(input)?;
    Ok((
        input,
        FormatChunk {
            format_code,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
        },
    ))
}

/// Read exactly `buf.len()` bytes, mapping a short read to `None`
fn read_or_eof<R: ByteSource + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<Option<()>> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(Some(())),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Scan a RIFF/WAVE stream for its first payload chunk
///
/// The stream is rewound to offset 0 first, so the returned `payload_start` is an
/// absolute offset into the stream. Channel count and bit depth are reported but
/// not checked here; see [`WavHeader::ensure_renderable`].
///
/// # Errors
///
/// `MalformedContainer` when the `RIFF`/`WAVE` tags do not match, when a `fmt `
/// chunk is shorter than its canonical body, or when the stream ends before a
/// `data` chunk header is found.
pub fn parse_header<R: ByteSource + ?Sized>(reader: &mut R) -> Result<WavHeader> {
    reader.seek(SeekFrom::Start(0))?;

    let mut preamble = [0u8; PREAMBLE_LEN];
    if read_or_eof(reader, &mut preamble)?.is_none() {
        return Err(AmbientError::MalformedContainer(
            "stream too short for container preamble".into(),
        ));
    }

    let (rest, _) = container_tag(&preamble)
        .map_err(|_| AmbientError::MalformedContainer("missing RIFF container tag".into()))?;
    // Total size field is not trusted
    let (rest, _) = le_u32::<_, nom::error::Error<&[u8]>>(rest)
        .map_err(|_| AmbientError::MalformedContainer("truncated size field".into()))?;
    format_tag(rest)
        .map_err(|_| AmbientError::MalformedContainer("missing WAVE format tag".into()))?;

    let mut offset = PREAMBLE_LEN as u64;
    let mut format: Option<FormatChunk> = None;

    loop {
        let mut raw = [0u8; CHUNK_HEADER_LEN];
        if read_or_eof(reader, &mut raw)?.is_none() {
            return Err(AmbientError::MalformedContainer(
                "end of stream before payload chunk".into(),
            ));
        }
        let (_, header) = chunk_header(&raw)
            .map_err(|_| AmbientError::MalformedContainer("unreadable chunk header".into()))?;
        offset += CHUNK_HEADER_LEN as u64;

        if &header.id == DATA_ID {
            return Ok(WavHeader {
                format,
                payload_start: offset,
                payload_length: header.size,
            });
        }

        if &header.id == FMT_ID {
            if header.size < FMT_CANONICAL_LEN {
                return Err(AmbientError::MalformedContainer(format!(
                    "format chunk of {} bytes is shorter than {}",
                    header.size, FMT_CANONICAL_LEN
                )));
            }
            let mut body = [0u8; FMT_CANONICAL_LEN as usize];
            if read_or_eof(reader, &mut body)?.is_none() {
                return Err(AmbientError::MalformedContainer(
                    "end of stream inside format chunk".into(),
                ));
            }
            let (_, fmt) = format_body(&body)
                .map_err(|_| AmbientError::MalformedContainer("unreadable format chunk".into()))?;
            format = Some(fmt);

            let extra = header.size - FMT_CANONICAL_LEN;
            if extra > 0 {
                reader.seek(SeekFrom::Current(extra as i64))?;
            }
        } else {
            reader.seek(SeekFrom::Current(header.size as i64))?;
        }
        offset += header.size as u64;
    }
}
