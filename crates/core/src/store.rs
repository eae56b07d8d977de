//! Key-value persistence.
//!
//! [`KeyValueStore`] is the injected replacement for browser local storage: string keys,
//! string values, get/set/remove/clear. Components that persist state (history, session)
//! receive an `Arc<dyn KeyValueStore>` instead of reaching for ambient globals.
//!
//! Two implementations are provided:
//! - [`MemoryStore`] for tests and ephemeral runs
//! - [`FileStore`], a single JSON object on disk, written through on every mutation

use crate::{CoreResult, MedinfoError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove(&self, key: &str) -> CoreResult<()>;
    fn clear(&self) -> CoreResult<()>;
}

/// Read a JSON value stored under `key`.
///
/// Returns `Ok(None)` when the key is absent and `MedinfoError::Deserialization` when the
/// stored text is not valid JSON for `T`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> CoreResult<Option<T>> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(MedinfoError::Deserialization))
        .transpose()
}

/// Serialise `value` as JSON and store it under `key`.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> CoreResult<()> {
    let raw = serde_json::to_string(value).map_err(MedinfoError::Serialization)?;
    store.set(key, &raw)
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Volatile store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        lock(&self.entries).clear();
        Ok(())
    }
}

/// Store persisted as one JSON object in a file.
///
/// The file is read once when the store is opened; every mutation rewrites it. Concurrent
/// processes sharing the file race with last-write-wins semantics.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `MedinfoError` if:
    /// - the parent directory cannot be created
    /// - an existing file cannot be read
    /// - an existing file is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(MedinfoError::StorageDirCreation)?;
        }

        let entries = if path.is_file() {
            let contents = fs::read_to_string(&path).map_err(MedinfoError::StorageRead)?;
            if contents.trim().is_empty() {
                Entries::new()
            } else {
                serde_json::from_str(&contents).map_err(MedinfoError::Deserialization)?
            }
        } else {
            Entries::new()
        };

        tracing::debug!("opened key-value store at {}", path.display());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &Entries) -> CoreResult<()> {
        let raw = serde_json::to_string_pretty(entries).map_err(MedinfoError::Serialization)?;
        fs::write(&self.path, raw).map_err(MedinfoError::StorageWrite)
    }

    fn mutate(&self, change: impl FnOnce(&mut Entries)) -> CoreResult<()> {
        let mut guard = lock(&self.entries);
        let mut next = guard.clone();
        change(&mut next);
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> CoreResult<()> {
        self.mutate(Entries::clear)
    }
}
