//! Storage namespace
//!
//! Resolves sound identifiers to seekable byte streams. Only the render context
//! ever opens files, so implementations need not be safe for concurrent opens
//! from several threads; they only need to be movable into the render thread.

use crate::container::ByteSource;
use crate::{AmbientError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opens sounds by identifier
pub trait Storage: Send {
    /// Stream type returned by [`Storage::open`]
    type Reader: ByteSource;

    /// Open the sound named `name`
    ///
    /// # Errors
    ///
    /// `OpenFailed` when no handle can be obtained.
    fn open(&self, name: &str) -> Result<Self::Reader>;
}

/// Storage rooted at a directory (e.g. a mounted SD card)
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Resolve identifiers relative to `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        FsStorage {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory identifiers are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    type Reader = File;

    fn open(&self, name: &str) -> Result<File> {
        let path = self.root.join(name);
        File::open(&path).map_err(|e| AmbientError::OpenFailed {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

/// In-memory storage, used for demos and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.insert(name.to_string(), Arc::from(bytes));
    }

    /// Builder-style [`MemoryStorage::insert`]
    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Remove a file, returning whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }
}

impl Storage for MemoryStorage {
    type Reader = Cursor<Arc<[u8]>>;

    fn open(&self, name: &str) -> Result<Self::Reader> {
        self.files
            .get(name)
            .map(|bytes| Cursor::new(Arc::clone(bytes)))
            .ok_or_else(|| AmbientError::OpenFailed {
                name: name.to_string(),
                reason: "no such file".into(),
            })
    }
}
