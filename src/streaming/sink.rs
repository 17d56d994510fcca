//! Sink feeding the audio device

use super::{AudioDevice, RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::sink::{SampleSink, StereoFrame};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Real-time output: frames go into the ring buffer, the device drains it
pub struct StreamingSink {
    ring_buffer: Arc<RingBuffer>,
    device: AudioDevice,
    scratch: Vec<i16>,
    overruns: u64,
}

impl StreamingSink {
    /// Open the default device with `config`
    pub fn open(config: StreamConfig) -> Result<Self> {
        let ring_buffer = Arc::new(RingBuffer::new(config.ring_buffer_size)?);
        let device = AudioDevice::new(config.sample_rate, config.channels, Arc::clone(&ring_buffer))?;
        log::debug!("Stream latency {:.1} ms", config.latency_ms());
        Ok(StreamingSink {
            ring_buffer,
            device,
            scratch: Vec::new(),
            overruns: 0,
        })
    }

    /// Times the writer had to wait for the device
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Buffer fill level in `[0, 1]`
    pub fn fill_percentage(&self) -> f32 {
        self.ring_buffer.fill_percentage()
    }

    /// Underlying device
    pub fn device(&self) -> &AudioDevice {
        &self.device
    }
}

impl SampleSink for StreamingSink {
    /// Blocks while the ring buffer is full
    fn write_frames(&mut self, frames: &[StereoFrame]) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend(frames.iter().flatten());

        let mut rest = &self.scratch[..];
        while !rest.is_empty() {
            let written = self.ring_buffer.write(rest);
            if written == 0 {
                self.overruns += 1;
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
            } else {
                rest = &rest[written..];
            }
        }
        Ok(())
    }

    fn set_frame_rate(&mut self, rate: u32) -> Result<()> {
        self.device.set_frame_rate(rate);
        Ok(())
    }
}
