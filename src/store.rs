//! Persistent key/value store backed by a single JSON document
//!
//! Provides a `Store` that maps string keys to arbitrary JSON-serializable
//! values, persisted as one pretty-printed JSON file per store. The whole
//! document is loaded into memory at open time and rewritten in full on
//! every mutation. There is no locking: two processes writing the same
//! store race, last writer wins, which is acceptable for the
//! single-invocation-per-launcher-action usage model.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Reserved document key holding the store's version tag.
///
/// The on-disk document is a flat map from user keys to values; the version
/// tag shares that namespace under this reserved name so the file stays a
/// single flat JSON object.
const VERSION_KEY: &str = "__store_version";

/// Errors that can occur when opening or mutating a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a valid JSON object
    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A value could not be serialized to JSON
    #[error("failed to serialize value for key `{key}`: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

/// Durable mapping from string keys to JSON values
///
/// One `Store` instance owns one file (`<dir>/<name>.json`). Every mutating
/// call (`set`, `set_many`, `delete`, `clear`) synchronously rewrites the
/// backing file; reads are served from memory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Path to the backing JSON file
    path: PathBuf,
    /// In-memory copy of the on-disk document
    document: BTreeMap<String, Value>,
}

impl Store {
    /// Opens (or creates) a store in the given directory
    ///
    /// The backing file is `<dir>/<name>.json`. A missing file yields an
    /// empty store; the file is created on the first mutation. If a
    /// `version` tag is supplied and the on-disk document records a
    /// different version, the store is reset (all entries cleared) before
    /// use and the new version recorded.
    ///
    /// # Arguments
    /// * `dir` - Directory holding the backing file (created on demand)
    /// * `name` - File stem, e.g. "config" or "cache"
    /// * `version` - Optional version tag for the whole store
    ///
    /// # Returns
    /// * `Ok(Store)` on success
    /// * `Err(StoreError::Corrupt)` if the file exists but cannot be parsed
    ///   as a JSON object
    /// * `Err(StoreError::Io)` if the file exists but cannot be read
    pub fn open(
        dir: impl Into<PathBuf>,
        name: &str,
        version: Option<&str>,
    ) -> Result<Self, StoreError> {
        let path = dir.into().join(format!("{}.json", name));

        let document = match fs::read_to_string(&path) {
            // Deserializing straight into a map rejects non-object documents
            // with the same Corrupt error as malformed JSON
            Ok(contents) => serde_json::from_str::<BTreeMap<String, Value>>(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };

        let mut store = Self { path, document };

        if let Some(version) = version {
            let recorded = store
                .document
                .get(VERSION_KEY)
                .and_then(Value::as_str)
                .map(str::to_string);

            if recorded.as_deref() != Some(version) {
                // Version mismatch (or first open): reset and re-tag
                store.document.clear();
                store
                    .document
                    .insert(VERSION_KEY.to_string(), Value::String(version.to_string()));
                store.flush()?;
            }
        }

        Ok(store)
    }

    /// Returns the value stored under `key`, deserialized to `T`
    ///
    /// Returns `None` if the key is absent or the stored value does not
    /// deserialize to `T`. Missing keys are not an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.document
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Returns a reference to the raw JSON value stored under `key`
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Stores `value` under `key`, overwriting any previous value
    ///
    /// Rewrites the backing file in full before returning.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;

        self.document.insert(key.to_string(), value);
        self.flush()
    }

    /// Stores several key/value pairs, rewriting the backing file once
    pub fn set_many(
        &mut self,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.document.insert(key, value);
        }
        self.flush()
    }

    /// Returns true if the store holds a value for `key`
    pub fn has(&self, key: &str) -> bool {
        self.document.contains_key(key)
    }

    /// Removes the value stored under `key`, if any
    ///
    /// Removing an absent key is a no-op that still succeeds (the file is
    /// not rewritten in that case).
    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        if self.document.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// Removes all entries, preserving the version tag if one is set
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let version = self.document.remove(VERSION_KEY);
        self.document.clear();
        if let Some(version) = version {
            self.document.insert(VERSION_KEY.to_string(), version);
        }
        self.flush()
    }

    /// Returns the path to the backing file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Rewrites the backing file with the current document
    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.document).map_err(StoreError::Corrupt)?;

        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn open_test_store(dir: &TempDir, version: Option<&str>) -> Store {
        Store::open(dir.path(), "test", version).expect("Open should succeed")
    }

    #[test]
    fn test_set_and_get_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = open_test_store(&temp_dir, None);

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        store.set("foo", &data).expect("Set should succeed");

        let read: TestData = store.get("foo").expect("Should read value back");
        assert_eq!(read, data);
        assert!(store.has("foo"));
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = open_test_store(&temp_dir, None);

        let result: Option<TestData> = store.get("nonexistent");
        assert!(result.is_none());
        assert!(!store.has("nonexistent"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        {
            let mut store = open_test_store(&temp_dir, None);
            store.set("foo", &"bar").expect("Set should succeed");
        }

        let store = open_test_store(&temp_dir, None);
        assert_eq!(store.get::<String>("foo"), Some("bar".to_string()));
    }

    #[test]
    fn test_set_many_writes_all_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = open_test_store(&temp_dir, None);

        store
            .set_many(vec![
                ("a".to_string(), serde_json::json!(1)),
                ("b".to_string(), serde_json::json!("two")),
            ])
            .expect("Bulk set should succeed");

        assert_eq!(store.get::<i32>("a"), Some(1));
        assert_eq!(store.get::<String>("b"), Some("two".to_string()));
    }

    #[test]
    fn test_delete_removes_key() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = open_test_store(&temp_dir, None);

        store.set("foo", &"bar").expect("Set should succeed");
        store.delete("foo").expect("Delete should succeed");

        assert!(!store.has("foo"));

        // Deleting an absent key is fine
        store.delete("foo").expect("Delete of absent key should succeed");
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = open_test_store(&temp_dir, None);

        store.set("a", &1).expect("Set should succeed");
        store.set("b", &2).expect("Set should succeed");
        store.clear().expect("Clear should succeed");

        assert!(!store.has("a"));
        assert!(!store.has("b"));
    }

    #[test]
    fn test_corrupt_file_fails_at_open() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("test.json"), "{ not json").expect("Write should succeed");

        let result = Store::open(temp_dir.path(), "test", None);
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_non_object_document_fails_at_open() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("test.json"), "[1, 2, 3]").expect("Write should succeed");

        let result = Store::open(temp_dir.path(), "test", None);
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_version_mismatch_resets_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        {
            let mut store = open_test_store(&temp_dir, Some("1.0.0"));
            store.set("foo", &"bar").expect("Set should succeed");
        }

        // Same version: entries survive
        {
            let store = open_test_store(&temp_dir, Some("1.0.0"));
            assert_eq!(store.get::<String>("foo"), Some("bar".to_string()));
        }

        // New version: store is reset
        let store = open_test_store(&temp_dir, Some("1.0.1"));
        assert!(!store.has("foo"));
    }

    #[test]
    fn test_clear_preserves_version_tag() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        {
            let mut store = open_test_store(&temp_dir, Some("1.0.0"));
            store.set("foo", &"bar").expect("Set should succeed");
            store.clear().expect("Clear should succeed");
        }

        // Reopening with the same version must not look like a mismatch
        let store = open_test_store(&temp_dir, Some("1.0.0"));
        assert!(!store.has("foo"));
        assert_eq!(
            store.get::<String>(VERSION_KEY),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn test_open_creates_directory_on_first_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("store").join("dir");

        let mut store = Store::open(&nested, "test", None).expect("Open should succeed");
        store.set("foo", &1).expect("Set should succeed");

        assert!(nested.join("test.json").exists());
    }
}
