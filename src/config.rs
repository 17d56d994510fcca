//! Engine configuration
//!
//! Track libraries, render tuning and control tuning, loadable from JSON.
//! Every field has a default so partial configuration files are accepted.

use crate::mixer::SoundChangeFailurePolicy;
use crate::{AmbientError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default output frame rate before pitch scaling
pub const DEFAULT_BASE_RATE: u32 = 11_025;
/// Default number of samples drained from every track per render cycle
pub const DEFAULT_BLOCK_SAMPLES: usize = 256;
/// Default trailing payload margin that triggers the loop back to the start
pub const DEFAULT_GUARD_BYTES: u32 = 512;
/// Full-scale reading of the analog controls (12-bit ADC)
pub const DEFAULT_RAW_MAX: u16 = 4095;

/// One track: display name and its ordered sound library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Display name used in status reports
    pub name: String,
    /// Sound identifiers, resolved by the storage backend
    pub sounds: Vec<String>,
    /// Sound opened at startup
    pub initial_sound: usize,
    /// Initial track volume in `[0, volume_max]`
    pub volume: f32,
    /// Initial filter coefficient in `[filter_min, filter_max]`
    pub filter: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        TrackConfig {
            name: String::from("Track"),
            sounds: Vec::new(),
            initial_sound: 0,
            volume: 0.8,
            filter: 0.3,
        }
    }
}

impl TrackConfig {
    /// Create a track configuration with default levels
    pub fn new(name: &str, sounds: &[&str]) -> Self {
        TrackConfig {
            name: name.to_string(),
            sounds: sounds.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

/// Render-side tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples read from every track per cycle
    pub block_samples: usize,
    /// Loop back once the cursor is within this many bytes of the payload end
    pub guard_bytes: u32,
    /// Output frame rate at pitch 1.0
    pub base_rate: u32,
    /// Filter resonance (damping of the band integrator)
    pub resonance: f32,
    /// Minimum pitch change before a new cadence is committed to the sink
    pub pitch_commit_delta: f32,
    /// What a failed sound change leaves behind
    pub failure_policy: SoundChangeFailurePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            block_samples: DEFAULT_BLOCK_SAMPLES,
            guard_bytes: DEFAULT_GUARD_BYTES,
            base_rate: DEFAULT_BASE_RATE,
            resonance: 0.2,
            pitch_commit_delta: 0.01,
            failure_policy: SoundChangeFailurePolicy::Silence,
        }
    }
}

/// Control-side tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Upper bound of per-track volume
    pub volume_max: f32,
    /// Volume change per encoder detent while the modifier is held
    pub nudge_step: f32,
    /// Lowest filter coefficient
    pub filter_min: f32,
    /// Highest filter coefficient (values near 1.0 approach instability)
    pub filter_max: f32,
    /// Pitch ratio at raw reading 0
    pub pitch_min: f32,
    /// Pitch ratio at full-scale reading
    pub pitch_max: f32,
    /// Raw distance within which a knob captures its parameter
    pub pickup_tolerance: u16,
    /// Full-scale analog reading
    pub raw_max: u16,
    /// Minimum interval between accepted track-select presses
    pub debounce_ms: u64,
    /// Interval between analog samples
    pub analog_interval_ms: u64,
    /// Sleep per control loop iteration
    pub poll_delay_ms: u64,
    /// Interval between status reports
    pub status_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            volume_max: 1.0,
            nudge_step: 0.003,
            filter_min: 0.01,
            filter_max: 0.99,
            pitch_min: 0.3,
            pitch_max: 1.0,
            pickup_tolerance: 80,
            raw_max: DEFAULT_RAW_MAX,
            debounce_ms: 200,
            analog_interval_ms: 50,
            poll_delay_ms: 1,
            status_interval_ms: 2000,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tracks, in track-select order
    pub tracks: Vec<TrackConfig>,
    /// Render tuning
    pub render: RenderConfig,
    /// Control tuning
    pub control: ControlConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl EngineConfig {
    /// Reference layout: three independent libraries of ambient loops
    pub fn reference() -> Self {
        EngineConfig {
            tracks: vec![
                TrackConfig::new(
                    "Water",
                    &[
                        "rain.wav",
                        "stream.wav",
                        "surf.wav",
                        "drips.wav",
                        "fountain.wav",
                        "storm.wav",
                    ],
                ),
                TrackConfig::new(
                    "Air",
                    &[
                        "wind.wav",
                        "breeze.wav",
                        "gale.wav",
                        "chimes.wav",
                        "leaves.wav",
                    ],
                ),
                TrackConfig::new(
                    "Life",
                    &[
                        "birds.wav",
                        "crickets.wav",
                        "frogs.wav",
                        "owls.wav",
                        "bees.wav",
                        "cafe.wav",
                        "train.wav",
                    ],
                ),
            ],
            render: RenderConfig::default(),
            control: ControlConfig::default(),
        }
    }

    /// Load configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AmbientError::ConfigError(format!(
                "Failed to read '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Parse configuration from JSON text and validate it
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| AmbientError::ConfigError(format!("Invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AmbientError::ConfigError(format!("Serialization failed: {e}")))
    }

    /// Check structural constraints the engine relies on
    pub fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(AmbientError::ConfigError("At least one track is required".into()));
        }
        for track in &self.tracks {
            if track.sounds.is_empty() {
                return Err(AmbientError::ConfigError(format!(
                    "Track '{}' has an empty sound library",
                    track.name
                )));
            }
            if track.initial_sound >= track.sounds.len() {
                return Err(AmbientError::ConfigError(format!(
                    "Track '{}' initial sound {} is outside its library of {}",
                    track.name,
                    track.initial_sound,
                    track.sounds.len()
                )));
            }
        }
        if self.render.block_samples == 0 {
            return Err(AmbientError::ConfigError("block_samples must be greater than 0".into()));
        }
        if self.render.base_rate == 0 {
            return Err(AmbientError::ConfigError("base_rate must be greater than 0".into()));
        }
        let c = &self.control;
        if !(c.filter_min < c.filter_max) {
            return Err(AmbientError::ConfigError(format!(
                "filter range [{}, {}] is empty",
                c.filter_min, c.filter_max
            )));
        }
        if !(c.pitch_min > 0.0 && c.pitch_min < c.pitch_max) {
            return Err(AmbientError::ConfigError(format!(
                "pitch range [{}, {}] is invalid",
                c.pitch_min, c.pitch_max
            )));
        }
        if !(c.volume_max > 0.0) {
            return Err(AmbientError::ConfigError("volume_max must be positive".into()));
        }
        if c.raw_max == 0 {
            return Err(AmbientError::ConfigError("raw_max must be greater than 0".into()));
        }
        Ok(())
    }
}
