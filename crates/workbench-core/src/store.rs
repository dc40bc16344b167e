//! Key-value store port.
//!
//! The session multiplexer persists its tab list through this trait so the
//! core never touches the filesystem directly. [`MemoryStore`] backs tests
//! and embedders with their own storage; [`JsonFileStore`] keeps every key
//! in one pretty-printed JSON object on disk.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Errors from store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Stored value for {key} has an unexpected shape: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Store file {} is corrupted: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable `get(key)` / `set(key, value)` storage.
pub trait KeyValueStore {
    /// Raw value stored under `key`, if any.
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Typed read with a fallback for a missing key.
    fn get<T>(&self, key: &str, default: T) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        Self: Sized,
    {
        match self.get_value(key)? {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
            None => Ok(default),
        }
    }

    /// Typed write.
    fn set<T>(&mut self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
        Self: Sized,
    {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set_value(key, value)
    }
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
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
}

impl KeyValueStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as a single JSON object file.
///
/// The whole file is read on open and rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "store file missing, starting empty");
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }
        let data = std::fs::read_to_string(&path)?;
        let entries = if data.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json =
            serde_json::to_string_pretty(&self.entries).map_err(|source| StoreError::Encode {
                key: "*".to_string(),
                source,
            })?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_get_falls_back_to_default() {
        let store = MemoryStore::new();
        let ids: Vec<String> = store.get("tabs", vec!["x".to_string()]).unwrap();
        assert_eq!(ids, ["x"]);
    }

    #[test]
    fn memory_set_then_get() {
        let mut store = MemoryStore::new();
        store.set("tabs", &["a", "b"]).unwrap();
        let ids: Vec<String> = store.get("tabs", Vec::new()).unwrap();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let mut store = MemoryStore::new();
        store.set_value("tabs", Value::from(42)).unwrap();
        let err = store.get::<Vec<String>>("tabs", Vec::new()).unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref key, .. } if key == "tabs"));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("tabs", &["t2", "t1"]).unwrap();
        store.set("theme", &"dark").unwrap();
        assert!(path.exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        let ids: Vec<String> = reopened.get("tabs", Vec::new()).unwrap();
        assert_eq!(ids, ["t2", "t1"]);
        let theme: String = reopened.get("theme", String::new()).unwrap();
        assert_eq!(theme, "dark");
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get_value("tabs").unwrap().is_none());
    }

    #[test]
    fn file_store_empty_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get_value("tabs").unwrap().is_none());
    }

    #[test]
    fn file_store_corrupted_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not valid json !!!").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
