//! Periodic status line

use crate::library::{SoundLibrary, TrackIndex};
use crate::params::ParameterStore;
use std::fmt;
use std::time::{Duration, Instant};

/// Snapshot of what the listener currently hears on the active track
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Active track
    pub track: TrackIndex,
    /// Active track display name
    pub track_name: String,
    /// Selected sound, zero-based
    pub sound: usize,
    /// Library size
    pub sound_count: usize,
    /// Active track volume
    pub volume: f32,
    /// Master pitch ratio
    pub pitch: f32,
    /// Active track filter coefficient
    pub filter: f32,
}

impl StatusReport {
    /// Read the current values from `params`
    pub fn capture(params: &ParameterStore, libraries: &[SoundLibrary]) -> Option<Self> {
        let track = params.active_track();
        let library = libraries.get(track.get())?;
        let snapshot = params.track_snapshot(track);
        Some(StatusReport {
            track,
            track_name: library.name().to_string(),
            sound: snapshot.selected,
            sound_count: library.len(),
            volume: snapshot.volume,
            pitch: params.master_pitch(),
            filter: snapshot.filter,
        })
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | sound {}/{} | vol {:>3}% | pitch {:.2} | filter {:.2}",
            self.track_name,
            self.sound + 1,
            self.sound_count,
            (self.volume * 100.0).round() as i32,
            self.pitch,
            self.filter
        )
    }
}

/// Emits a [`StatusReport`] through `log` at a fixed interval
#[derive(Debug)]
pub struct StatusReporter {
    libraries: Vec<SoundLibrary>,
    interval: Duration,
    next_due: Option<Instant>,
}

impl StatusReporter {
    /// Report every `interval`, starting with the first tick
    pub fn new(libraries: Vec<SoundLibrary>, interval: Duration) -> Self {
        StatusReporter {
            libraries,
            interval,
            next_due: None,
        }
    }

    /// Emit a report if one is due; returns it for callers that want it
    pub fn tick(&mut self, now: Instant, params: &ParameterStore) -> Option<StatusReport> {
        if matches!(self.next_due, Some(next) if now < next) {
            return None;
        }
        self.next_due = Some(now + self.interval);
        let report = StatusReport::capture(params, &self.libraries)?;
        log::info!("{}", report);
        Some(report)
    }
}
