//! Durable key-value storage for client state
//!
//! A small string-slot store that survives process restarts. Values are kept
//! in a single JSON object on disk and mirrored in memory, so reads never touch
//! the filesystem after the first load.
//!
//! # Example
//!
//! ```rust,ignore
//! use zerobite_core::storage::{FileStore, KeyValueStore};
//!
//! let store = FileStore::open(FileStore::default_path())?;
//! store.set("refresh", "eyJ0eXAi...")?;
//! assert!(store.get("refresh")?.is_some());
//! ```

use crate::error::{Error, ErrorCode, Result, ResultExt};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Directory name used under the platform data directory
const APP_DIR: &str = "zerobite";

/// Default file name for the persisted slots
const DEFAULT_FILE: &str = "credentials.json";

/// A durable string key-value area
pub trait KeyValueStore: Send + Sync {
    /// Read a slot
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a slot
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a slot (no-op when absent)
    fn remove(&self, key: &str) -> Result<()>;

    /// Apply several writes and removals as one persisted update
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<()> {
        for (key, value) in changes {
            match value {
                Some(v) => self.set(key, v)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// In-memory store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// JSON-file backed store
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is treated as an empty store; the file and its parent
    /// directory are created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let slots = if path.exists() {
            let content = fs::read_to_string(&path).at(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::storage_corrupted(&path).with_source(e)
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            slots: RwLock::new(slots),
        })
    }

    /// Default location: `<data dir>/zerobite/credentials.json`
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".zerobite"))
            .join(APP_DIR)
            .join(DEFAULT_FILE)
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).at(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(slots)
            .map_err(|e| Error::new(ErrorCode::Internal, "Failed to encode slots").with_source(e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).at(&tmp)?;
        fs::rename(&tmp, &self.path).at(&self.path)?;

        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut slots);
        self.persist(&slots)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|slots| {
            slots.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|slots| {
            slots.remove(key);
        })
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<()> {
        self.update(|slots| {
            for (key, value) in changes {
                match value {
                    Some(v) => {
                        slots.insert((*key).to_string(), (*v).to_string());
                    }
                    None => {
                        slots.remove(*key);
                    }
                }
            }
        })
    }
}
