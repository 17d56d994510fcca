//! Sound change arbiter
//!
//! Services pending sound-change requests from inside the render loop, so that
//! storage is only ever touched from one context.

use super::source::TrackSource;
use crate::library::{SoundIndex, SoundLibrary, TrackIndex};
use crate::params::ParameterStore;
use crate::storage::Storage;
use crate::AmbientError;
use serde::{Deserialize, Serialize};

/// What a failed reopen leaves on the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundChangeFailurePolicy {
    /// Close the old sound first; on failure the track stays silent
    #[default]
    Silence,
    /// Open the new sound first; on failure the old one keeps playing
    KeepPrevious,
}

/// Result of servicing one request
#[derive(Debug)]
pub enum SoundChange {
    /// New sound installed, cursor at its payload start
    Installed(SoundIndex),
    /// Reopen failed; the track is silent or still on its previous sound
    Failed {
        /// Sound that was requested
        sound: SoundIndex,
        /// Why it could not be installed
        error: AmbientError,
    },
    /// Requested index is outside the track's library
    OutOfRange(usize),
}

/// Services pending sound changes for one render loop
#[derive(Debug, Clone, Copy, Default)]
pub struct SoundChangeArbiter {
    policy: SoundChangeFailurePolicy,
}

impl SoundChangeArbiter {
    /// Create an arbiter with the given failure policy
    pub fn new(policy: SoundChangeFailurePolicy) -> Self {
        SoundChangeArbiter { policy }
    }

    /// Failure policy in use
    pub fn policy(&self) -> SoundChangeFailurePolicy {
        self.policy
    }

    /// Take the pending request for `track`, if any, and act on it
    ///
    /// The request is consumed before the reopen starts, so a newer request made
    /// meanwhile stays pending for the next cycle. Filter state is not touched.
    pub fn service<S: Storage>(
        &self,
        storage: &S,
        params: &ParameterStore,
        track: TrackIndex,
        library: &SoundLibrary,
        source: &mut Option<TrackSource<S::Reader>>,
    ) -> Option<SoundChange> {
        let raw = params.take_sound_change(track)?;
        let Some(sound) = library.index(raw) else {
            log::warn!(
                "Track {} ({}): ignoring sound change to {} (library has {})",
                track,
                library.name(),
                raw,
                library.len()
            );
            return Some(SoundChange::OutOfRange(raw));
        };
        let name = library.sound(sound);

        if self.policy == SoundChangeFailurePolicy::Silence {
            // Old handle is released before the new one is confirmed
            *source = None;
        }

        match TrackSource::open(storage, name) {
            Ok(new_source) => {
                *source = Some(new_source);
                params.publish_selected_sound(track, sound);
                log::info!(
                    "Track {} ({}): now playing '{}' [{}/{}]",
                    track,
                    library.name(),
                    name,
                    sound.get() + 1,
                    library.len()
                );
                Some(SoundChange::Installed(sound))
            }
            Err(error) => {
                let outcome = match self.policy {
                    SoundChangeFailurePolicy::Silence => "track is silent",
                    SoundChangeFailurePolicy::KeepPrevious => "keeping previous sound",
                };
                log::warn!(
                    "Track {} ({}): failed to switch to '{}': {} ({})",
                    track,
                    library.name(),
                    name,
                    error,
                    outcome
                );
                Some(SoundChange::Failed { sound, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::test_support::wav_bytes;
    use crate::params::TrackInit;
    use crate::storage::MemoryStorage;

    fn setup() -> (MemoryStorage, ParameterStore, SoundLibrary) {
        let storage = MemoryStorage::new()
            .with_file("a.wav", wav_bytes(&[1; 64]))
            .with_file("b.wav", wav_bytes(&[2; 128]))
            .with_file("bad.wav", b"not a wave file".to_vec());
        let params = ParameterStore::new(&[TrackInit {
            volume: 1.0,
            filter: 0.5,
            selected: 0,
        }]);
        let library = SoundLibrary::new(
            "Water",
            vec!["a.wav".into(), "b.wav".into(), "bad.wav".into(), "gone.wav".into()],
        )
        .unwrap();
        (storage, params, library)
    }

    #[test]
    fn test_no_request_is_noop() {
        let (storage, params, library) = setup();
        let arbiter = SoundChangeArbiter::default();
        let mut source = Some(TrackSource::open(&storage, "a.wav").unwrap());
        let t = TrackIndex::new(0);
        assert!(arbiter
            .service(&storage, &params, t, &library, &mut source)
            .is_none());
        assert_eq!(source.unwrap().name(), "a.wav");
    }

    #[test]
    fn test_successful_switch() {
        let (storage, params, library) = setup();
        let arbiter = SoundChangeArbiter::default();
        let t = TrackIndex::new(0);
        let mut source = Some(TrackSource::open(&storage, "a.wav").unwrap());

        params.request_sound_change(t, library.index(1).unwrap());
        let change = arbiter.service(&storage, &params, t, &library, &mut source);

        assert!(matches!(change, Some(SoundChange::Installed(s)) if s.get() == 1));
        let source = source.unwrap();
        assert_eq!(source.name(), "b.wav");
        assert_eq!(source.cursor(), source.header().payload_start);
        assert_eq!(params.selected_sound(t), 1);
        assert_eq!(params.pending_sound_change(t), None);
    }

    #[test]
    fn test_failed_switch_leaves_track_silent() {
        let (storage, params, library) = setup();
        let arbiter = SoundChangeArbiter::new(SoundChangeFailurePolicy::Silence);
        let t = TrackIndex::new(0);
        let mut source = Some(TrackSource::open(&storage, "a.wav").unwrap());

        params.request_sound_change(t, library.index(2).unwrap());
        let change = arbiter.service(&storage, &params, t, &library, &mut source);

        assert!(matches!(
            change,
            Some(SoundChange::Failed {
                error: AmbientError::MalformedContainer(_),
                ..
            })
        ));
        assert!(source.is_none());
        assert_eq!(params.selected_sound(t), 0);
        assert_eq!(params.pending_sound_change(t), None);
    }

    #[test]
    fn test_failed_switch_can_keep_previous() {
        let (storage, params, library) = setup();
        let arbiter = SoundChangeArbiter::new(SoundChangeFailurePolicy::KeepPrevious);
        let t = TrackIndex::new(0);
        let mut source = Some(TrackSource::open(&storage, "a.wav").unwrap());

        params.request_sound_change(t, library.index(3).unwrap());
        let change = arbiter.service(&storage, &params, t, &library, &mut source);

        assert!(matches!(
            change,
            Some(SoundChange::Failed {
                error: AmbientError::OpenFailed { .. },
                ..
            })
        ));
        assert_eq!(source.unwrap().name(), "a.wav");
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&SoundChangeFailurePolicy::KeepPrevious).unwrap();
        assert_eq!(json, "\"keep_previous\"");
    }
}
