//! Output sinks
//!
//! The renderer hands every cycle's frames to a [`SampleSink`]. The sink owns the
//! output cadence: `set_frame_rate` is how the master pitch reaches the hardware.

use crate::Result;

/// Interleaved left/right pair
pub type StereoFrame = [i16; 2];

/// Destination for rendered frames
pub trait SampleSink {
    /// Queue frames for output, in order
    fn write_frames(&mut self, frames: &[StereoFrame]) -> Result<()>;

    /// Change the frame rate at which queued frames are consumed
    fn set_frame_rate(&mut self, rate: u32) -> Result<()>;
}

impl<K: SampleSink + ?Sized> SampleSink for Box<K> {
    fn write_frames(&mut self, frames: &[StereoFrame]) -> Result<()> {
        (**self).write_frames(frames)
    }

    fn set_frame_rate(&mut self, rate: u32) -> Result<()> {
        (**self).set_frame_rate(rate)
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    frames: Vec<StereoFrame>,
    rate_changes: Vec<u32>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All frames written so far
    pub fn frames(&self) -> &[StereoFrame] {
        &self.frames
    }

    /// Every frame rate requested, in order
    pub fn rate_changes(&self) -> &[u32] {
        &self.rate_changes
    }

    /// Most recent frame rate
    pub fn frame_rate(&self) -> Option<u32> {
        self.rate_changes.last().copied()
    }

    /// Left channel only
    pub fn mono(&self) -> Vec<i16> {
        self.frames.iter().map(|f| f[0]).collect()
    }

    /// Take the collected frames, leaving the sink empty
    pub fn take_frames(&mut self) -> Vec<StereoFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl SampleSink for MemorySink {
    fn write_frames(&mut self, frames: &[StereoFrame]) -> Result<()> {
        self.frames.extend_from_slice(frames);
        Ok(())
    }

    fn set_frame_rate(&mut self, rate: u32) -> Result<()> {
        self.rate_changes.push(rate);
        Ok(())
    }
}
