//! Client-local key-value persistence.
//!
//! The dashboard keeps two small pieces of state between sessions: the
//! acknowledgement map and the user preferences. Both live in a single
//! JSON file keyed under an application prefix so unrelated tooling
//! sharing the same directory cannot collide with us.
//!
//! Failure semantics are deliberately forgiving: a missing or corrupt
//! store reads as empty, and a failed write is logged and swallowed.
//! Losing this state only loses notification read-state - it must never
//! take the application down.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::logging::{self, SourceKind};

/// Default namespace prefix for all persisted keys.
pub const STORAGE_PREFIX: &str = "riomon_";

/// Abstract key-value store consumed by the acknowledgement store and
/// the preferences loader. Handed to components by the composition root;
/// tests use [`MemoryStore`].
pub trait KvStore {
    /// Returns the stored value for `key`, or `None` if absent or if the
    /// underlying storage failed.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`. Failures are swallowed (logged only).
    fn set(&mut self, key: &str, value: Value);

    /// Removes `key` if present.
    fn remove(&mut self, key: &str);
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// JSON-file-backed store. The whole map is rewritten on every `set`,
/// which is fine at this scale (two keys, a few KiB).
pub struct FileStore {
    path: PathBuf,
    prefix: String,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            prefix: STORAGE_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(path: impl Into<PathBuf>, prefix: &str) -> Self {
        FileStore {
            path: path.into(),
            prefix: prefix.to_string(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn read_map(&self) -> HashMap<String, Value> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&text) {
            Ok(map) => map,
            Err(e) => {
                // Corrupt store reads as empty; next write replaces it.
                logging::warn(
                    SourceKind::Storage,
                    None,
                    &format!("discarding corrupt store {}: {}", self.path.display(), e),
                );
                HashMap::new()
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, Value>) {
        let text = match serde_json::to_string(map) {
            Ok(text) => text,
            Err(e) => {
                logging::error(SourceKind::Storage, None, &format!("serialize failed: {}", e));
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, text) {
            logging::error(
                SourceKind::Storage,
                None,
                &format!("write to {} failed: {}", self.path.display(), e),
            );
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.read_map().remove(&self.namespaced(key))
    }

    fn set(&mut self, key: &str, value: Value) {
        let mut map = self.read_map();
        map.insert(self.namespaced(key), value);
        self.write_map(&map);
    }

    fn remove(&mut self, key: &str) {
        let mut map = self.read_map();
        if map.remove(&self.namespaced(key)).is_some() {
            self.write_map(&map);
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store (tests, ephemeral sessions)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    map: HashMap<String, Value>,
    /// Number of successful `set` calls, exposed so tests can assert on
    /// write batching (one persisted write per batch operation).
    pub write_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
        self.write_count += 1;
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        let mut store = FileStore::new(&path);

        assert!(store.get("prefs").is_none(), "fresh store should be empty");

        store.set("prefs", json!({"theme": "dark"}));
        assert_eq!(store.get("prefs"), Some(json!({"theme": "dark"})));

        store.remove("prefs");
        assert!(store.get("prefs").is_none());
    }

    #[test]
    fn test_keys_are_namespaced_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        let mut store = FileStore::new(&path);
        store.set("acks", json!({}));

        let raw = std::fs::read_to_string(&path).expect("store file should exist");
        assert!(
            raw.contains("riomon_acks"),
            "on-disk key should carry the namespace prefix, got: {}",
            raw
        );
    }

    #[test]
    fn test_corrupt_store_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert!(
            store.get("acks").is_none(),
            "corrupt store must read as empty, never error"
        );
    }

    #[test]
    fn test_corrupt_store_recovers_on_next_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "garbage").unwrap();

        let mut store = FileStore::new(&path);
        store.set("acks", json!({"k": 1}));
        assert_eq!(store.get("acks"), Some(json!({"k": 1})));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let store = FileStore::new("/nonexistent/dir/store.json");
        assert!(store.get("anything").is_none());
    }
}
