// Durable key-value store boundary.
//
// The core treats persistence as a flat string-keyed store with three
// operations: `get`, `set`, `clear`. Each memento field lives under its own
// key (see `memento.rs`), so a reader never observes half of a multi-field
// write: every key is written and read independently.
//
// Two implementations ship with the core:
// - `MemoryStore`: a `BTreeMap`, used by tests and headless runs.
// - `DirStore`: one file per key in a directory. `set` writes to a temp
//   file and renames it into place, so a single field is replaced
//   atomically on the same filesystem. Values carry the `.kv.json`
//   extension, and `clear` only removes files named like a key of this
//   store. Other files in the directory (a config, notes) are left alone.

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Flat string-keyed durable storage.
pub trait KeyValueStore {
    /// Read the value at `key`; `Ok(None)` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value at `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove every key.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

/// Directory-backed store: key `k` lives in `<dir>/k.kv.json`.
#[derive(Clone, Debug)]
pub struct DirStore {
    dir: PathBuf,
}

const VALUE_EXT: &str = "kv.json";
const TEMP_EXT: &str = "kv.json.tmp";

/// Keys become file stems, so they are restricted to a portable subset.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !key.starts_with('.')
}

/// The key a file in the store directory holds, if it is one of ours.
fn owned_key(file_name: &str) -> Option<&str> {
    [TEMP_EXT, VALUE_EXT].into_iter().find_map(|ext| {
        let key = file_name.strip_suffix(ext)?.strip_suffix('.')?;
        is_valid_key(key).then_some(key)
    })
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str, ext: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{ext}")))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key, VALUE_EXT)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key, VALUE_EXT)?;
        let tmp = self.path_for(key, TEMP_EXT)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!(key, bytes = value.len(), "store write");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: self.dir.display().to_string(),
            source,
        };
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(key) = path.file_name().and_then(|n| n.to_str()).and_then(owned_key) else {
                continue;
            };
            if path.is_file() {
                debug!(key, "store remove");
                fs::remove_file(&path).map_err(io_err)?;
            }
        }
        Ok(())
    }
}
