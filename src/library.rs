//! Sound libraries
//!
//! Each track owns an immutable, ordered list of sound identifiers. Sounds are
//! addressed by [`SoundIndex`], which can only be obtained through the library it
//! indexes, so an out-of-range selection cannot be represented.

use crate::{AmbientError, Result};
use std::fmt;
use std::sync::Arc;

/// Position of a sound inside one track's library
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundIndex(usize);

impl SoundIndex {
    /// Raw position
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SoundIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a track in the engine's fixed track list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackIndex(usize);

impl TrackIndex {
    /// Wrap a raw track position unchecked
    ///
    /// [`ParameterStore::track_index`](crate::params::ParameterStore::track_index)
    /// yields one already checked against the track count.
    pub fn new(index: usize) -> Self {
        TrackIndex(index)
    }

    /// Raw position
    pub fn get(self) -> usize {
        self.0
    }

    /// Next track, wrapping over `count` tracks
    pub fn next(self, count: usize) -> Self {
        TrackIndex((self.0 + 1) % count.max(1))
    }
}

impl fmt::Display for TrackIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable ordered list of sound identifiers for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundLibrary {
    name: Arc<str>,
    sounds: Arc<[String]>,
}

impl SoundLibrary {
    /// Build a library; an empty sound list is rejected
    pub fn new(name: &str, sounds: Vec<String>) -> Result<Self> {
        if sounds.is_empty() {
            return Err(AmbientError::ConfigError(format!(
                "Library '{}' has no sounds",
                name
            )));
        }
        Ok(SoundLibrary {
            name: Arc::from(name),
            sounds: Arc::from(sounds),
        })
    }

    /// Display name of the track this library belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of sounds (never zero)
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// Always false; libraries are non-empty by construction
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Bounds-checked index
    pub fn index(&self, raw: usize) -> Option<SoundIndex> {
        (raw < self.sounds.len()).then_some(SoundIndex(raw))
    }

    /// First sound
    pub fn first(&self) -> SoundIndex {
        SoundIndex(0)
    }

    /// Identifier of the sound at `index`
    pub fn sound(&self, index: SoundIndex) -> &str {
        &self.sounds[index.0]
    }

    /// Next sound, wrapping to the start
    pub fn next(&self, index: SoundIndex) -> SoundIndex {
        SoundIndex((index.0 + 1) % self.sounds.len())
    }

    /// Previous sound, wrapping to the end
    pub fn previous(&self, index: SoundIndex) -> SoundIndex {
        let len = self.sounds.len();
        SoundIndex((index.0 + len - 1) % len)
    }

    /// All identifiers in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sounds.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(n: usize) -> SoundLibrary {
        SoundLibrary::new("Test", (0..n).map(|i| format!("s{i}.wav")).collect()).unwrap()
    }

    #[test]
    fn test_empty_library_rejected() {
        assert!(SoundLibrary::new("Empty", Vec::new()).is_err());
    }

    #[test]
    fn test_bounds_checked_index() {
        let lib = library(5);
        assert_eq!(lib.index(4).map(SoundIndex::get), Some(4));
        assert!(lib.index(5).is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let lib = library(5);
        let last = lib.index(4).unwrap();
        assert_eq!(lib.next(last), lib.first());
        assert_eq!(lib.previous(lib.first()), last);
        assert_eq!(lib.sound(lib.next(lib.first())), "s1.wav");
    }

    #[test]
    fn test_single_sound_navigation_is_stable() {
        let lib = library(1);
        assert_eq!(lib.next(lib.first()), lib.first());
        assert_eq!(lib.previous(lib.first()), lib.first());
    }

    #[test]
    fn test_track_index_wraps() {
        let t = TrackIndex::new(2);
        assert_eq!(t.next(3), TrackIndex::new(0));
        assert_eq!(TrackIndex::new(0).next(3), TrackIndex::new(1));
    }
}
