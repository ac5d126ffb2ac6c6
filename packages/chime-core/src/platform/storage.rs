//! Key-value persistence for user preferences.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;

/// Store file name inside the data directory.
const STORE_FILE: &str = "chime_store.json";

/// Errors from key-value store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed (permissions, full disk, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file held something other than a JSON object.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Synchronous string-keyed storage.
///
/// Writes are durable before the call returns, so callers can treat a
/// successful `set` as persisted. Implementations must be safe to share
/// across threads behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes the value stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion could not be persisted.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store for tests and ephemeral embeddings.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// Serialize all file store access. Multiple store instances may point at the
// same path (tests do this to prove persistence survives a reload).
static STORE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn store_lock() -> &'static Mutex<()> {
    STORE_LOCK.get_or_init(|| Mutex::new(()))
}

/// File-backed store holding a single JSON object.
///
/// Every mutation rewrites the whole file atomically (write to a temp file,
/// then rename), so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `data_dir`. The directory is created on
    /// first write, not here.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORE_FILE),
        }
    }

    fn read_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return serde_json::Map::new();
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                log::warn!(
                    "[Store] Ignoring unreadable store file at {}",
                    self.path.display()
                );
                serde_json::Map::new()
            }
        }
    }

    fn write_map(&self, map: &serde_json::Map<String, serde_json::Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = store_lock().lock();
        self.read_map()
            .get(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = store_lock().lock();
        let mut map = self.read_map();
        map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = store_lock().lock();
        let mut map = self.read_map();
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}
