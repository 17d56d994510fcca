//! Ambient Sound Mixer
//!
//! Streams and mixes a fixed set of looping audio tracks from removable storage,
//! runs every track through its own resonant state-variable filter and volume,
//! and exposes live control (master pitch, master volume, per-track filter,
//! per-track volume, track selection, sound selection) through physical controls.
//!
//! Two execution contexts cooperate without locks:
//! - **Render** owns the track sources, filters and file I/O and produces a
//!   continuous stream of interleaved 16-bit stereo frames.
//! - **Control** turns encoder events, button edges and knob readings into
//!   writes to the shared [`ParameterStore`].
//!
//! The only state shared between the two is the parameter store, which holds one
//! atomic per scalar field with exactly one writer per field.
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Offline render
//! ```no_run
//! use ambient_mixer::{EngineConfig, FsStorage, Renderer, ParameterStore, WavSink};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::reference();
//! let params = Arc::new(ParameterStore::from_config(&config));
//! let storage = FsStorage::new("/media/sd");
//! let mut renderer = Renderer::new(&config, storage, Arc::clone(&params)).unwrap();
//! let mut sink = WavSink::create("out.wav", config.render.base_rate).unwrap();
//! for _ in 0..100 {
//!     renderer.render_cycle(&mut sink).unwrap();
//! }
//! sink.finalize().unwrap();
//! ```
//!
//! ## Two contexts
//! ```no_run
//! use ambient_mixer::{Engine, EngineConfig, FsStorage, MemorySink};
//! use ambient_mixer::control::ScriptedSurface;
//!
//! let config = EngineConfig::reference();
//! let engine = Engine::new(config, FsStorage::new("/media/sd")).unwrap();
//! let handle = engine.spawn(ScriptedSurface::idle(), MemorySink::new()).unwrap();
//! std::thread::sleep(std::time::Duration::from_millis(500));
//! handle.shutdown().unwrap();
//! ```

#![warn(missing_docs)]

pub mod config; // Engine configuration
pub mod container; // RIFF/WAVE header parsing
pub mod control; // Control context: encoder, buttons, knobs, pickup
pub mod engine; // Two-context and single-context runtimes
pub mod export; // Offline WAV output
pub mod library; // Sound libraries and bounds-checked indices
pub mod mixer; // Render context: sources, filters, arbiter, renderer
pub mod params; // Lock-free parameter store
pub mod sink; // Output sink abstraction
pub mod status; // Periodic status report
pub mod storage; // Storage namespace abstraction
#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming

/// Error types for mixer operations
#[derive(thiserror::Error, Debug)]
pub enum AmbientError {
    /// Container tags are wrong or the stream ended before a payload chunk
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Container parsed but its sample format cannot be rendered
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Storage handle for a sound could not be obtained
    #[error("Failed to open '{name}': {reason}")]
    OpenFailed {
        /// Sound identifier that was requested
        name: String,
        /// Underlying reason reported by the storage backend
        reason: String,
    },

    /// IO error from storage or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for AmbientError {
    /// Converts a String into `AmbientError::Other`.
    ///
    /// Prefer the specific variants (`MalformedContainer`, `ConfigError`, ...) where
    /// the failure has a known category.
    fn from(msg: String) -> Self {
        AmbientError::Other(msg)
    }
}

impl From<&str> for AmbientError {
    /// Converts a string slice into `AmbientError::Other`.
    fn from(msg: &str) -> Self {
        AmbientError::Other(msg.to_string())
    }
}

/// Result type for mixer operations
pub type Result<T> = std::result::Result<T, AmbientError>;

// Public API exports
pub use config::{ControlConfig, EngineConfig, RenderConfig, TrackConfig};
pub use container::{parse_header, FormatCode, WavHeader};
pub use control::{ControlProcessor, ControlSurface, EncoderEvent};
pub use engine::{Engine, EngineHandle};
pub use export::WavSink;
pub use library::{SoundIndex, SoundLibrary, TrackIndex};
pub use mixer::{CycleOutcome, Renderer, SoundChangeFailurePolicy, StateVariableFilter};
pub use params::ParameterStore;
pub use sink::{MemorySink, SampleSink, StereoFrame};
pub use status::{StatusReport, StatusReporter};
pub use storage::{FsStorage, MemoryStorage, Storage};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, RingBuffer, StreamConfig, StreamingSink};
