//! Volatile name-to-bytes store.
//!
//! The store lives for the server process lifetime and is the only state
//! shared between connections. Entries are immutable once committed; an
//! upload replaces the whole entry in a single insert, so readers see either
//! the previous blob or the new one, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A committed file.
#[derive(Debug, Clone)]
pub struct StoredFile {
    data: Arc<[u8]>,
    declared_hash: String,
}

impl StoredFile {
    pub fn new(data: impl Into<Arc<[u8]>>, declared_hash: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            declared_hash: declared_hash.into(),
        }
    }

    /// File content. Cheap to clone; the bytes are shared.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Hash announced by the uploader. Never verified against [`data`](Self::data).
    pub fn declared_hash(&self) -> &str {
        &self.declared_hash
    }
}

/// Cloneable handle to the shared store.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    inner: Arc<RwLock<HashMap<String, StoredFile>>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits `file` under `name`, replacing any previous entry.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn put(&self, name: impl Into<String>, file: StoredFile) -> Option<StoredFile> {
        let name = name.into();
        let size = file.size();
        let previous = self.write().insert(name.clone(), file);
        tracing::debug!(
            name = %name,
            size,
            replaced = previous.is_some(),
            "file committed to store"
        );
        previous
    }

    /// Returns the entry stored under `name`.
    pub fn get(&self, name: &str) -> Option<StoredFile> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Stored names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sum of all stored blob sizes.
    pub fn total_bytes(&self) -> u64 {
        self.read().values().map(StoredFile::size).sum()
    }

    // Every operation is a single map call, so a panic elsewhere cannot leave
    // the map half-updated; recover from poisoning instead of propagating it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredFile>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredFile>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
