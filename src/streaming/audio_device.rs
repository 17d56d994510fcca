//! Audio device integration using rodio
//!
//! The source reports its frame rate per batch, so a pitch change committed by
//! the render context takes effect at the next batch boundary.

use super::RingBuffer;
use crate::{AmbientError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Samples pulled from the ring buffer per batch
const BATCH_SAMPLES: usize = 1024;
/// Silence inserted on underrun, whole frames only
const UNDERRUN_SAMPLES: usize = 64;

/// rodio source draining the ring buffer
struct RingBufferSource {
    ring_buffer: Arc<RingBuffer>,
    frame_rate: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
    channels: u16,
    sample_rate: u32,
    batch: Vec<i16>,
    filled: usize,
    pos: usize,
}

impl RingBufferSource {
    fn new(
        ring_buffer: Arc<RingBuffer>,
        frame_rate: Arc<AtomicU32>,
        channels: u16,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let mut source = RingBufferSource {
            ring_buffer,
            frame_rate,
            finished,
            channels,
            sample_rate: 1,
            batch: vec![0; BATCH_SAMPLES],
            filled: 0,
            pos: 0,
        };
        source.refill();
        source
    }

    /// Load the next batch and latch its rate; leaves `pos < filled`
    fn refill(&mut self) {
        // Whole frames only, so left/right never swap
        let frame = self.channels.max(1) as usize;
        let want = (self.ring_buffer.available_read() / frame * frame).min(self.batch.len());
        let read = if want > 0 {
            self.ring_buffer.read(&mut self.batch[..want])
        } else {
            0
        };
        if read > 0 {
            self.filled = read;
        } else {
            self.batch[..UNDERRUN_SAMPLES].fill(0);
            self.filled = UNDERRUN_SAMPLES;
        }
        self.pos = 0;
        self.sample_rate = self.frame_rate.load(Ordering::Relaxed).max(1);
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.filled - self.pos)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        let sample = self.batch[self.pos];
        self.pos += 1;
        // Refill now so frame length and rate already describe what plays next
        if self.pos >= self.filled {
            self.refill();
        }
        Some(sample)
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    frame_rate: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output and start draining `ring_buffer`
    ///
    /// # Errors
    ///
    /// `AudioDeviceError` when no output device is available.
    pub fn new(sample_rate: u32, channels: u16, ring_buffer: Arc<RingBuffer>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            AmbientError::AudioDeviceError(format!("Failed to create audio stream: {e}"))
        })?;
        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            AmbientError::AudioDeviceError(format!("Failed to create audio sink: {e}"))
        })?;

        let frame_rate = Arc::new(AtomicU32::new(sample_rate));
        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring_buffer,
            Arc::clone(&frame_rate),
            channels,
            Arc::clone(&finished),
        ));
        log::info!("Audio device open: {} Hz, {} channels", sample_rate, channels);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            frame_rate,
            finished,
        })
    }

    /// Change the rate at which buffered frames are played
    pub fn set_frame_rate(&self, rate: u32) {
        self.frame_rate.store(rate, Ordering::Relaxed);
    }

    /// Current playback frame rate
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.load(Ordering::Relaxed)
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Stop draining the buffer
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}
