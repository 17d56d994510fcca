//! Lock-free parameter store
//!
//! The only state shared between the control and render contexts. Every field is
//! a single atomic scalar with exactly one writing context:
//!
//! | Field                      | Writer  | Reader  |
//! |----------------------------|---------|---------|
//! | track volume               | Control | Render  |
//! | track filter coefficient   | Control | Render  |
//! | pending sound change (set) | Control | Render  |
//! | pending sound change (clear)| Render | Control |
//! | selected sound             | Render  | Control |
//! | active track               | Control | Control, status |
//! | master volume / pitch      | Control | Render  |
//!
//! Continuously sampled values use `Relaxed` ordering: a stale read only delays a
//! change by one loop iteration. The pending slot is taken with an atomic `swap`,
//! so a request written while the previous one is being serviced stays pending.

use crate::config::EngineConfig;
use crate::library::{SoundIndex, TrackIndex};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Marker for an empty pending-sound-change slot
const EMPTY_SLOT: u32 = u32::MAX;

/// `f32` stored as its bit pattern
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct TrackParams {
    volume: AtomicF32,
    filter: AtomicF32,
    selected: AtomicUsize,
    pending: AtomicU32,
}

/// Initial values for one track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackInit {
    /// Starting volume
    pub volume: f32,
    /// Starting filter coefficient
    pub filter: f32,
    /// Sound opened at startup
    pub selected: usize,
}

/// Point-in-time copy of one track's parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSnapshot {
    /// Volume
    pub volume: f32,
    /// Filter coefficient
    pub filter: f32,
    /// Selected (confirmed) sound
    pub selected: usize,
    /// Outstanding sound change request
    pub pending: Option<usize>,
}

/// Shared parameters for all tracks plus master controls
///
/// # Panics
///
/// Every per-track accessor panics when given a [`TrackIndex`] at or beyond
/// [`track_count`](Self::track_count). Use [`track_index`](Self::track_index)
/// to turn an unchecked position into one the store accepts.
#[derive(Debug)]
pub struct ParameterStore {
    tracks: Box<[TrackParams]>,
    active_track: AtomicUsize,
    master_volume: AtomicF32,
    master_pitch: AtomicF32,
}

impl ParameterStore {
    /// Create a store for the given tracks; master volume and pitch start at 1.0
    pub fn new(tracks: &[TrackInit]) -> Self {
        let tracks = tracks
            .iter()
            .map(|t| TrackParams {
                volume: AtomicF32::new(t.volume),
                filter: AtomicF32::new(t.filter),
                selected: AtomicUsize::new(t.selected),
                pending: AtomicU32::new(EMPTY_SLOT),
            })
            .collect();
        ParameterStore {
            tracks,
            active_track: AtomicUsize::new(0),
            master_volume: AtomicF32::new(1.0),
            master_pitch: AtomicF32::new(1.0),
        }
    }

    /// Create a store from the configured track levels
    pub fn from_config(config: &EngineConfig) -> Self {
        let c = &config.control;
        let inits: Vec<TrackInit> = config
            .tracks
            .iter()
            .map(|t| TrackInit {
                volume: t.volume.clamp(0.0, c.volume_max),
                filter: t.filter.clamp(c.filter_min, c.filter_max),
                selected: t.initial_sound,
            })
            .collect();
        Self::new(&inits)
    }

    /// Number of tracks (fixed for the store's lifetime)
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Checked track index, `None` when `raw` is out of range
    pub fn track_index(&self, raw: usize) -> Option<TrackIndex> {
        (raw < self.tracks.len()).then(|| TrackIndex::new(raw))
    }

    fn track(&self, track: TrackIndex) -> &TrackParams {
        &self.tracks[track.get()]
    }

    // Control-written, Render-read

    /// Track volume
    #[inline]
    pub fn volume(&self, track: TrackIndex) -> f32 {
        self.track(track).volume.load()
    }

    /// Set track volume (control context)
    pub fn set_volume(&self, track: TrackIndex, volume: f32) {
        self.track(track).volume.store(volume);
    }

    /// Track filter coefficient
    #[inline]
    pub fn filter(&self, track: TrackIndex) -> f32 {
        self.track(track).filter.load()
    }

    /// Set track filter coefficient (control context)
    pub fn set_filter(&self, track: TrackIndex, coefficient: f32) {
        self.track(track).filter.store(coefficient);
    }

    /// Master volume in `[0, 1]`
    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.master_volume.load()
    }

    /// Set master volume (control context)
    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume.store(volume);
    }

    /// Master pitch ratio
    #[inline]
    pub fn master_pitch(&self) -> f32 {
        self.master_pitch.load()
    }

    /// Set master pitch ratio (control context)
    pub fn set_master_pitch(&self, pitch: f32) {
        self.master_pitch.store(pitch);
    }

    /// Track currently bound to the encoder and filter knob
    pub fn active_track(&self) -> TrackIndex {
        TrackIndex::new(self.active_track.load(Ordering::Relaxed))
    }

    /// Set the active track (control context)
    pub fn set_active_track(&self, track: TrackIndex) {
        self.active_track.store(track.get(), Ordering::Relaxed);
    }

    // Sound change hand-off

    /// Request a switch to `sound` (control context); replaces any unconsumed request
    pub fn request_sound_change(&self, track: TrackIndex, sound: SoundIndex) {
        self.track(track)
            .pending
            .store(sound.get() as u32, Ordering::Release);
    }

    /// Outstanding request without consuming it
    pub fn pending_sound_change(&self, track: TrackIndex) -> Option<usize> {
        match self.track(track).pending.load(Ordering::Acquire) {
            EMPTY_SLOT => None,
            raw => Some(raw as usize),
        }
    }

    /// Take and clear the outstanding request (render context)
    pub fn take_sound_change(&self, track: TrackIndex) -> Option<usize> {
        match self.track(track).pending.swap(EMPTY_SLOT, Ordering::AcqRel) {
            EMPTY_SLOT => None,
            raw => Some(raw as usize),
        }
    }

    /// Sound the render context is currently playing (or last attempted)
    pub fn selected_sound(&self, track: TrackIndex) -> usize {
        self.track(track).selected.load(Ordering::Acquire)
    }

    /// Publish the sound now installed on `track` (render context)
    pub fn publish_selected_sound(&self, track: TrackIndex, sound: SoundIndex) {
        self.track(track)
            .selected
            .store(sound.get(), Ordering::Release);
    }

    /// Copy of one track's parameters
    ///
    /// # Panics
    ///
    /// When `track` is out of range, like every per-track accessor.
    pub fn track_snapshot(&self, track: TrackIndex) -> TrackSnapshot {
        TrackSnapshot {
            volume: self.volume(track),
            filter: self.filter(track),
            selected: self.selected_sound(track),
            pending: self.pending_sound_change(track),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SoundLibrary;
    use std::sync::Arc;

    fn store() -> ParameterStore {
        ParameterStore::new(&[
            TrackInit {
                volume: 0.5,
                filter: 0.3,
                selected: 0,
            },
            TrackInit {
                volume: 0.7,
                filter: 0.6,
                selected: 2,
            },
        ])
    }

    fn index(raw: usize) -> SoundIndex {
        let lib = SoundLibrary::new("t", (0..8).map(|i| i.to_string()).collect()).unwrap();
        lib.index(raw).unwrap()
    }

    #[test]
    fn test_initial_values() {
        let s = store();
        assert_eq!(s.track_count(), 2);
        assert_eq!(s.volume(TrackIndex::new(1)), 0.7);
        assert_eq!(s.filter(TrackIndex::new(0)), 0.3);
        assert_eq!(s.selected_sound(TrackIndex::new(1)), 2);
        assert_eq!(s.master_volume(), 1.0);
        assert_eq!(s.master_pitch(), 1.0);
        assert_eq!(s.active_track(), TrackIndex::new(0));
    }

    #[test]
    fn test_f32_fields_round_trip_exactly() {
        let s = store();
        let t = TrackIndex::new(0);
        s.set_volume(t, 0.123_456_79);
        s.set_filter(t, 0.987_654_3);
        s.set_master_pitch(0.3);
        assert_eq!(s.volume(t), 0.123_456_79);
        assert_eq!(s.filter(t), 0.987_654_3);
        assert_eq!(s.master_pitch(), 0.3);
    }

    #[test]
    fn test_pending_slot_latest_wins() {
        let s = store();
        let t = TrackIndex::new(0);
        assert_eq!(s.pending_sound_change(t), None);

        s.request_sound_change(t, index(3));
        s.request_sound_change(t, index(5));
        assert_eq!(s.pending_sound_change(t), Some(5));

        assert_eq!(s.take_sound_change(t), Some(5));
        assert_eq!(s.take_sound_change(t), None);
        assert_eq!(s.pending_sound_change(t), None);
    }

    #[test]
    fn test_pending_slots_are_per_track() {
        let s = store();
        s.request_sound_change(TrackIndex::new(1), index(1));
        assert_eq!(s.take_sound_change(TrackIndex::new(0)), None);
        assert_eq!(s.take_sound_change(TrackIndex::new(1)), Some(1));
    }

    #[test]
    fn test_track_index_is_checked() {
        let s = store();
        assert_eq!(s.track_index(1), Some(TrackIndex::new(1)));
        assert_eq!(s.track_index(2), None);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_track_panics() {
        store().volume(TrackIndex::new(2));
    }

    #[test]
    fn test_publish_selected() {
        let s = store();
        let t = TrackIndex::new(0);
        s.publish_selected_sound(t, index(4));
        let snap = s.track_snapshot(t);
        assert_eq!(snap.selected, 4);
        assert_eq!(snap.pending, None);
    }

    #[test]
    fn test_no_request_lost_across_threads() {
        // Control sets requests, render takes them; every taken value is one
        // that was written, and the final request is never lost.
        let s = Arc::new(store());
        let t = TrackIndex::new(0);
        let writer = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    s.request_sound_change(t, index(i % 8));
                }
            })
        };
        let mut taken = Vec::new();
        while !writer.is_finished() {
            if let Some(k) = s.take_sound_change(t) {
                taken.push(k);
            }
        }
        writer.join().unwrap();
        if let Some(k) = s.take_sound_change(t) {
            taken.push(k);
        }
        assert!(taken.iter().all(|&k| k < 8));
        assert_eq!(taken.last().copied(), Some(999 % 8));
    }
}
