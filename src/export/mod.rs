//! Offline export
//!
//! Writes the renderer's output to disk instead of an audio device.

pub mod wav;

pub use wav::{render_to_wav, WavSink};
