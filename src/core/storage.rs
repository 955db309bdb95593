//! Key-value storage slots
//!
//! The store persists its snapshot into a string-keyed slot, the way the web
//! app used browser local storage. [`KeyValueStorage`] is that capability;
//! [`MemoryStorage`] shares one map between handles in a process (several
//! "tabs" in tests), [`DirectoryStorage`] keeps one file per key so separate
//! processes see the same slots.
//!
//! [`SnapshotPersistence`] is the narrower seam the store talks to:
//! load the snapshot bytes if any, save new bytes.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use super::codec::{self, SnapshotError};

/// Storage key used by the single-page store
pub const STANDARD_DB_KEY: &str = "emakhua_database_v2";

/// Storage key used by the shared store
pub const SHARED_DB_KEY: &str = "emakhua_shared_db";

/// Storage key holding the last-update marker watched by the sync monitor
pub const LAST_UPDATE_KEY: &str = "db_last_update";

/// A string-keyed, string-valued storage area
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, SnapshotError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), SnapshotError>;
    fn remove_item(&self, key: &str) -> Result<(), SnapshotError>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), SnapshotError> {
        (**self).remove_item(key)
    }
}

/// In-process storage; clones share the same underlying map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let items = self
            .items
            .lock()
            .map_err(|_| SnapshotError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| SnapshotError::Storage("memory storage lock poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SnapshotError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| SnapshotError::Storage("memory storage lock poisoned".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// Storage backed by a directory, one `<key>.json` file per slot
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Use (and create if needed) the given directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

impl KeyValueStorage for DirectoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        // Write then rename so a concurrent reader never sees half a slot
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(value.as_bytes())?;
        file.persist(self.slot_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), SnapshotError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Where the store loads and saves its snapshot
pub trait SnapshotPersistence: Send {
    /// Load the persisted snapshot; `Ok(None)` means nothing was ever saved
    fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError>;

    /// Replace the persisted snapshot
    fn save(&self, bytes: &[u8]) -> Result<(), SnapshotError>;
}

/// A snapshot kept in one key of a [`KeyValueStorage`], codec-encoded
#[derive(Debug, Clone)]
pub struct StorageSlot<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> StorageSlot<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Drop the persisted snapshot so the next init starts fresh
    pub fn clear(&self) -> Result<(), SnapshotError> {
        self.storage.remove_item(&self.key)
    }
}

impl<S: KeyValueStorage> SnapshotPersistence for StorageSlot<S> {
    fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        match self.storage.get_item(&self.key)? {
            Some(text) => codec::decode(&text).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.storage.set_item(&self.key, &codec::encode(bytes)?)
    }
}
