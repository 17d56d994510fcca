//! Real-time audio output
//!
//! The render context writes interleaved frames into a ring buffer; a rodio
//! source drains it on the audio thread at whatever frame rate the master pitch
//! last committed. A full buffer blocks the writer, which paces the render loop
//! to the device.

pub mod audio_device;
pub mod ring_buffer;
pub mod sink;

pub use audio_device::AudioDevice;
pub use ring_buffer::RingBuffer;
pub use sink::StreamingSink;

/// Writer back-off while the ring buffer is full
pub const BUFFER_BACKOFF_MICROS: u64 = 200;

/// Output channel count (mono mix duplicated to L/R)
pub const OUTPUT_CHANNELS: u16 = 2;

/// Configuration for streaming playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Size of the ring buffer in samples (both channels counted)
    pub ring_buffer_size: usize,
    /// Initial frame rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: u16,
}

impl StreamConfig {
    /// Small buffer, about 93 ms of stereo at 11025 Hz
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 2048,
            sample_rate,
            channels: OUTPUT_CHANNELS,
        }
    }

    /// Larger buffer for hosts with scheduling jitter
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 8192,
            sample_rate,
            channels: OUTPUT_CHANNELS,
        }
    }

    /// Buffer latency in milliseconds at the initial frame rate
    pub fn latency_ms(&self) -> f32 {
        let frames = self.ring_buffer_size as f32 / self.channels.max(1) as f32;
        frames / self.sample_rate as f32 * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(crate::config::DEFAULT_BASE_RATE)
    }
}
