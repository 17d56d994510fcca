//! Render context
//!
//! Owns every track's source, filter and sample block and turns them into a
//! stream of interleaved 16-bit stereo frames, one fixed-size block per cycle.
//!
//! Per cycle:
//! 1. Pending sound changes are serviced (file I/O stays on this side)
//! 2. A committed pitch change is forwarded to the sink
//! 3. One block is read from every track; if any track comes back empty the
//!    whole cycle is skipped and no cursor moves
//! 4. Samples are scaled by track volume, filtered, summed in an `i32`,
//!    scaled by master volume, clipped and duplicated to both channels
//! 5. Cursors inside the guard band loop back to their payload start

pub mod arbiter;
pub mod filter;
pub mod source;

pub use arbiter::{SoundChange, SoundChangeArbiter, SoundChangeFailurePolicy};
pub use filter::StateVariableFilter;
pub use source::TrackSource;

use crate::config::{EngineConfig, RenderConfig};
use crate::library::{SoundIndex, SoundLibrary, TrackIndex};
use crate::params::ParameterStore;
use crate::sink::{SampleSink, StereoFrame};
use crate::storage::Storage;
use crate::{AmbientError, Result};
use std::sync::Arc;

/// What one render cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// `frames` stereo frames were written to the sink
    Rendered {
        /// Frames emitted this cycle
        frames: usize,
    },
    /// At least one track returned no data; nothing was emitted
    Skipped,
}

/// Clamp a mixed value into the 16-bit output range
#[inline]
pub fn clip_sample(value: f32) -> i16 {
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Add one filtered track output to the wide accumulator
#[inline]
pub fn accumulate(mixed: i32, filtered: f32) -> i32 {
    mixed.saturating_add(filtered as i32)
}

/// Apply master volume to the accumulated mix and clip it
#[inline]
pub fn master_and_clip(mixed: i32, master_volume: f32) -> i16 {
    clip_sample(mixed as f32 * master_volume)
}

/// Render-side state of one track
#[derive(Debug)]
struct RenderTrack<R: crate::container::ByteSource> {
    index: TrackIndex,
    library: SoundLibrary,
    source: Option<TrackSource<R>>,
    filter: StateVariableFilter,
    block: Vec<i16>,
    read: usize,
    volume: f32,
    coefficient: f32,
}

/// The render loop body
///
/// Generic over the storage backend so embedded and hosted targets can supply
/// their own block I/O.
pub struct Renderer<S: Storage> {
    storage: S,
    params: Arc<ParameterStore>,
    tracks: Vec<RenderTrack<S::Reader>>,
    config: RenderConfig,
    arbiter: SoundChangeArbiter,
    scratch: Vec<u8>,
    frames: Vec<StereoFrame>,
    committed_pitch: Option<f32>,
    cycles: u64,
    skipped: u64,
    skip_streak: u64,
}

impl<S: Storage> Renderer<S> {
    /// Open every track's initial sound
    ///
    /// # Errors
    ///
    /// Any failure to open or parse an initial sound is returned; the engine must
    /// not start with a subset of its tracks.
    pub fn new(config: &EngineConfig, storage: S, params: Arc<ParameterStore>) -> Result<Self> {
        config.validate()?;
        if params.track_count() != config.tracks.len() {
            return Err(AmbientError::ConfigError(format!(
                "parameter store holds {} tracks, configuration {}",
                params.track_count(),
                config.tracks.len()
            )));
        }

        let render = config.render;
        let mut tracks = Vec::with_capacity(config.tracks.len());
        for (i, track_config) in config.tracks.iter().enumerate() {
            let index = TrackIndex::new(i);
            let library = SoundLibrary::new(&track_config.name, track_config.sounds.clone())?;
            let sound = library.index(track_config.initial_sound).ok_or_else(|| {
                AmbientError::ConfigError(format!(
                    "initial sound {} out of range for '{}'",
                    track_config.initial_sound, track_config.name
                ))
            })?;
            let source = TrackSource::open(&storage, library.sound(sound))?;
            params.publish_selected_sound(index, sound);
            log::info!(
                "Track {} ({}): starting with '{}'",
                index,
                library.name(),
                library.sound(sound)
            );
            tracks.push(RenderTrack {
                index,
                library,
                source: Some(source),
                filter: StateVariableFilter::new(render.resonance),
                block: vec![0; render.block_samples],
                read: 0,
                volume: 0.0,
                coefficient: 0.0,
            });
        }

        Ok(Renderer {
            storage,
            params,
            tracks,
            config: render,
            arbiter: SoundChangeArbiter::new(render.failure_policy),
            scratch: vec![0; render.block_samples * source::BYTES_PER_SAMPLE],
            frames: Vec::with_capacity(render.block_samples),
            committed_pitch: None,
            cycles: 0,
            skipped: 0,
            skip_streak: 0,
        })
    }

    /// Shared parameter store
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Cursor of `track`, `None` when the track is silent
    pub fn cursor(&self, track: TrackIndex) -> Option<u64> {
        self.tracks
            .get(track.get())
            .and_then(|t| t.source.as_ref())
            .map(TrackSource::cursor)
    }

    /// Payload start of `track`'s current sound
    pub fn payload_start(&self, track: TrackIndex) -> Option<u64> {
        self.tracks
            .get(track.get())
            .and_then(|t| t.source.as_ref())
            .map(|s| s.header().payload_start)
    }

    /// Name of the sound `track` is playing
    pub fn current_sound(&self, track: TrackIndex) -> Option<&str> {
        self.tracks
            .get(track.get())
            .and_then(|t| t.source.as_ref())
            .map(TrackSource::name)
    }

    /// Filter state of `track`
    pub fn filter(&self, track: TrackIndex) -> Option<&StateVariableFilter> {
        self.tracks.get(track.get()).map(|t| &t.filter)
    }

    /// Pitch ratio last forwarded to the sink
    pub fn committed_pitch(&self) -> Option<f32> {
        self.committed_pitch
    }

    /// Cycles run and cycles skipped so far
    pub fn cycle_stats(&self) -> (u64, u64) {
        (self.cycles, self.skipped)
    }

    /// Selected sound index as seen by the render side
    pub fn selected_sound(&self, track: TrackIndex) -> Option<SoundIndex> {
        let t = self.tracks.get(track.get())?;
        t.library.index(self.params.selected_sound(track))
    }

    fn service_sound_changes(&mut self) {
        for track in &mut self.tracks {
            self.arbiter.service(
                &self.storage,
                &self.params,
                track.index,
                &track.library,
                &mut track.source,
            );
        }
    }

    /// Forward the master pitch to the sink when it moved far enough
    fn commit_pitch<K: SampleSink + ?Sized>(&mut self, sink: &mut K) -> Result<()> {
        let pitch = self.params.master_pitch();
        let changed = match self.committed_pitch {
            None => true,
            Some(last) => (pitch - last).abs() > self.config.pitch_commit_delta,
        };
        if changed {
            let rate = (self.config.base_rate as f32 * pitch).round().max(1.0) as u32;
            sink.set_frame_rate(rate)?;
            log::debug!("Output cadence {} Hz (pitch {:.3})", rate, pitch);
            self.committed_pitch = Some(pitch);
        }
        Ok(())
    }

    /// Read one block from every track; `None` if any track came back empty
    fn read_blocks(&mut self) -> Option<usize> {
        let mut n = usize::MAX;
        for track in &mut self.tracks {
            match track.source.as_mut() {
                Some(source) => match source.read_block(&mut track.block, &mut self.scratch) {
                    Ok(0) => return None,
                    Ok(samples) => track.read = samples,
                    Err(e) => {
                        log::warn!("Track {}: read failed: {}", track.index, e);
                        return None;
                    }
                },
                None => {
                    track.block.fill(0);
                    track.read = track.block.len();
                }
            }
            n = n.min(track.read);
        }
        Some(n)
    }

    /// Run one render cycle
    ///
    /// # Errors
    ///
    /// Only sink failures are returned; storage trouble skips the cycle.
    pub fn render_cycle<K: SampleSink + ?Sized>(&mut self, sink: &mut K) -> Result<CycleOutcome> {
        self.cycles += 1;
        self.service_sound_changes();
        self.commit_pitch(sink)?;

        let Some(n) = self.read_blocks() else {
            self.skipped += 1;
            self.skip_streak += 1;
            if self.skip_streak == 1 {
                log::warn!("Cycle {} skipped: a track returned no data", self.cycles);
            } else {
                log::debug!("Cycle {} skipped ({} in a row)", self.cycles, self.skip_streak);
            }
            return Ok(CycleOutcome::Skipped);
        };
        self.skip_streak = 0;

        let master = self.params.master_volume();
        // Volume and coefficient are sampled once per cycle
        for track in &mut self.tracks {
            track.volume = self.params.volume(track.index);
            track.coefficient = self.params.filter(track.index);
        }

        self.frames.clear();
        for i in 0..n {
            let mut mixed = 0i32;
            for track in &mut self.tracks {
                let x = track.block[i] as f32 * track.volume;
                mixed = accumulate(mixed, track.filter.process(x, track.coefficient));
            }
            let sample = master_and_clip(mixed, master);
            self.frames.push([sample, sample]);
        }
        sink.write_frames(&self.frames)?;

        let guard = self.config.guard_bytes;
        for track in &mut self.tracks {
            if let Some(source) = track.source.as_mut() {
                source.advance(track.read);
                if source.wrap_if_needed(guard) {
                    log::trace!("Track {} looped", track.index);
                }
            }
        }

        Ok(CycleOutcome::Rendered { frames: n })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::wav_bytes;
    use super::*;
    use crate::config::TrackConfig;
    use crate::sink::MemorySink;
    use crate::storage::MemoryStorage;

    fn config(names: &[&str]) -> EngineConfig {
        let mut config = EngineConfig::reference();
        config.tracks = names
            .iter()
            .map(|n| {
                let mut t = TrackConfig::new(n, &[*n, "alt.wav", "broken.wav"]);
                t.volume = 1.0;
                t.filter = 0.5;
                t
            })
            .collect();
        config
    }

    fn renderer(storage: MemoryStorage, names: &[&str]) -> Renderer<MemoryStorage> {
        let config = config(names);
        let params = Arc::new(ParameterStore::from_config(&config));
        Renderer::new(&config, storage, params).unwrap()
    }

    #[test]
    fn test_clip_sample_bounds() {
        assert_eq!(clip_sample(40_000.0), i16::MAX);
        assert_eq!(clip_sample(-40_000.0), i16::MIN);
        assert_eq!(clip_sample(1234.9), 1234);
        assert_eq!(clip_sample(f32::NAN), 0);
    }

    #[test]
    fn test_mix_clips_instead_of_wrapping() {
        let mixed = [30_000.0f32; 3].iter().fold(0, |acc, &y| accumulate(acc, y));
        assert_eq!(mixed, 90_000);
        assert_eq!(master_and_clip(mixed, 1.0), i16::MAX);
        assert_eq!(master_and_clip(-mixed, 1.0), i16::MIN);
        assert_eq!(master_and_clip(mixed, 0.25), 22_500);
    }

    #[test]
    fn test_startup_failure_is_fatal() {
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[0; 600]));
        let config = config(&["a.wav", "missing.wav"]);
        let params = Arc::new(ParameterStore::from_config(&config));
        let err = Renderer::new(&config, storage, params).err().unwrap();
        assert!(matches!(err, AmbientError::OpenFailed { .. }));
    }

    #[test]
    fn test_cycle_emits_duplicated_stereo() {
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[1000; 1024]));
        let mut r = renderer(storage, &["a.wav"]);
        let mut sink = MemorySink::new();

        let outcome = r.render_cycle(&mut sink).unwrap();
        assert_eq!(outcome, CycleOutcome::Rendered { frames: 256 });
        assert_eq!(sink.frames().len(), 256);
        assert!(sink.frames().iter().all(|f| f[0] == f[1]));
        assert_eq!(sink.rate_changes(), &[11025]);
    }

    #[test]
    fn test_atomic_block_skip() {
        // Second track declares more payload than it holds: 300 samples present
        let mut short = wav_bytes(&[500; 300]);
        short[40..44].copy_from_slice(&4096u32.to_le_bytes());
        let storage = MemoryStorage::new()
            .with_file("a.wav", wav_bytes(&[1000; 2048]))
            .with_file("b.wav", short);
        let mut r = renderer(storage, &["a.wav", "b.wav"]);
        let mut sink = MemorySink::new();
        let a = TrackIndex::new(0);
        let b = TrackIndex::new(1);

        assert_eq!(
            r.render_cycle(&mut sink).unwrap(),
            CycleOutcome::Rendered { frames: 256 }
        );
        assert_eq!(
            r.render_cycle(&mut sink).unwrap(),
            CycleOutcome::Rendered { frames: 44 }
        );
        let (a_cursor, b_cursor) = (r.cursor(a), r.cursor(b));
        let emitted = sink.frames().len();

        assert_eq!(r.render_cycle(&mut sink).unwrap(), CycleOutcome::Skipped);
        assert_eq!(sink.frames().len(), emitted);
        assert_eq!(r.cursor(a), a_cursor);
        assert_eq!(r.cursor(b), b_cursor);
        assert_eq!(r.cycle_stats(), (3, 1));
    }

    #[test]
    fn test_volume_zero_is_silent() {
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[20_000; 1024]));
        let mut r = renderer(storage, &["a.wav"]);
        r.params().set_volume(TrackIndex::new(0), 0.0);
        let mut sink = MemorySink::new();
        r.render_cycle(&mut sink).unwrap();
        assert!(sink.frames().iter().all(|f| *f == [0, 0]));
    }

    #[test]
    fn test_master_volume_scales_output() {
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[1000; 4096]));
        let mut loud = renderer(storage.clone(), &["a.wav"]);
        let mut quiet = renderer(storage, &["a.wav"]);
        quiet.params().set_master_volume(0.5);

        let mut a = MemorySink::new();
        let mut b = MemorySink::new();
        for _ in 0..8 {
            loud.render_cycle(&mut a).unwrap();
            quiet.render_cycle(&mut b).unwrap();
        }
        let last_loud = a.frames().last().unwrap()[0] as i32;
        let last_quiet = b.frames().last().unwrap()[0] as i32;
        assert!((last_quiet - last_loud / 2).abs() <= 1);
    }

    #[test]
    fn test_loop_after_payload_minus_guard() {
        // 2048 payload bytes, guard 512: loops after 1536 bytes = 3 blocks
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[7; 1024]));
        let mut r = renderer(storage, &["a.wav"]);
        let t = TrackIndex::new(0);
        let start = r.payload_start(t).unwrap();
        let mut sink = MemorySink::new();

        r.render_cycle(&mut sink).unwrap();
        assert_eq!(r.cursor(t), Some(start + 512));
        r.render_cycle(&mut sink).unwrap();
        assert_eq!(r.cursor(t), Some(start + 1024));
        r.render_cycle(&mut sink).unwrap();
        assert_eq!(r.cursor(t), Some(start));
    }

    #[test]
    fn test_sound_change_keeps_filter_state() {
        let storage = MemoryStorage::new()
            .with_file("a.wav", wav_bytes(&[8000; 4096]))
            .with_file("alt.wav", wav_bytes(&[-8000; 4096]));
        let mut r = renderer(storage, &["a.wav"]);
        let t = TrackIndex::new(0);
        let mut sink = MemorySink::new();
        r.render_cycle(&mut sink).unwrap();
        let before = *r.filter(t).unwrap();

        let lib = SoundLibrary::new("x", vec!["a.wav".into(), "alt.wav".into()]).unwrap();
        r.params().request_sound_change(t, lib.index(1).unwrap());
        r.render_cycle(&mut sink).unwrap();

        assert_eq!(r.current_sound(t), Some("alt.wav"));
        assert_eq!(r.selected_sound(t).map(SoundIndex::get), Some(1));
        // First post-switch sample ran through the pre-switch state
        let first_after = sink.frames()[256][0];
        let mut fresh = StateVariableFilter::new(0.2);
        let mut carried = before;
        assert_eq!(first_after, clip_sample(carried.process(-8000.0, 0.5)));
        assert_ne!(first_after, clip_sample(fresh.process(-8000.0, 0.5)));
    }

    #[test]
    fn test_silent_track_does_not_gate_cycle() {
        let storage = MemoryStorage::new()
            .with_file("a.wav", wav_bytes(&[1000; 4096]))
            .with_file("b.wav", wav_bytes(&[1000; 4096]))
            .with_file("broken.wav", b"RIFFxxxxJUNK".to_vec());
        let mut r = renderer(storage, &["a.wav", "b.wav"]);
        let b = TrackIndex::new(1);
        let lib = SoundLibrary::new("x", vec!["b.wav".into(), "alt.wav".into(), "broken.wav".into()])
            .unwrap();
        r.params().request_sound_change(b, lib.index(2).unwrap());

        let mut sink = MemorySink::new();
        assert_eq!(
            r.render_cycle(&mut sink).unwrap(),
            CycleOutcome::Rendered { frames: 256 }
        );
        assert_eq!(r.cursor(b), None);
        assert!(r.cursor(TrackIndex::new(0)).is_some());
    }

    #[test]
    fn test_pitch_commit_threshold() {
        let storage = MemoryStorage::new().with_file("a.wav", wav_bytes(&[0; 4096]));
        let mut r = renderer(storage, &["a.wav"]);
        let mut sink = MemorySink::new();

        r.render_cycle(&mut sink).unwrap();
        r.params().set_master_pitch(0.995);
        r.render_cycle(&mut sink).unwrap();
        assert_eq!(sink.rate_changes(), &[11025]);

        r.params().set_master_pitch(0.5);
        r.render_cycle(&mut sink).unwrap();
        assert_eq!(sink.rate_changes(), &[11025, 5513]);
        assert_eq!(r.committed_pitch(), Some(0.5));
    }
}
