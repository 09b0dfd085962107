//! Read access to the bucket store.
//!
//! The key-value engine holding consolidated records lives outside this
//! crate; all observa needs from it is a read by key into a fixed-size
//! buffer, expressed by [`BucketStore`]. Two read-only implementations are
//! provided:
//!
//! - [`MemoryStore`] — an in-process map, for fixtures and tests
//! - [`JsonStore`] — a JSON dump of `key -> [f64; N]`, for offline inspection
//!
//! ```text
//! {
//!     "15_Mar_Lcycle_2_Morning": [1.0, 12.0, 80.5, ...],
//!     "15_Mar_Lcycle_2_Afternoon": [0.0, 11.0, 80.4, ...]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, StoreError};

/// Read contract of the external key-value store.
pub trait BucketStore {
    /// Copies the value stored under `key` into `buf`.
    ///
    /// Returns `true` only if a value of exactly `buf.len()` bytes was found
    /// and copied. On `false`, `buf` must be left untouched.
    fn read(&self, key: &str, buf: &mut [u8]) -> bool;
}

impl<S: BucketStore + ?Sized> BucketStore for &S {
    fn read(&self, key: &str, buf: &mut [u8]) -> bool {
        (**self).read(key, buf)
    }
}

/// In-memory bucket store holding raw byte values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BucketStore for MemoryStore {
    fn read(&self, key: &str, buf: &mut [u8]) -> bool {
        match self.entries.get(key) {
            Some(value) if value.len() == buf.len() => {
                buf.copy_from_slice(value);
                true
            }
            Some(value) => {
                tracing::warn!(
                    "bucket '{key}' holds {} bytes, expected {}",
                    value.len(),
                    buf.len()
                );
                false
            }
            None => false,
        }
    }
}

/// Read-only bucket store loaded from a JSON object of key to number array.
///
/// Values are re-encoded on read as consecutive little-endian `f64`s.
#[derive(Debug, Clone, Default)]
pub struct JsonStore {
    entries: HashMap<String, Vec<f64>>,
}

impl JsonStore {
    /// Loads a store from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or is not a JSON
    /// object mapping keys to number arrays.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let entries = serde_json::from_str(&content).map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self { entries })
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the stored keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl BucketStore for JsonStore {
    fn read(&self, key: &str, buf: &mut [u8]) -> bool {
        let Some(values) = self.entries.get(key) else {
            return false;
        };

        if values.len() * size_of::<f64>() != buf.len() {
            tracing::warn!(
                "bucket '{key}' holds {} values, expected {}",
                values.len(),
                buf.len() / size_of::<f64>()
            );
            return false;
        }

        for (chunk, value) in buf.chunks_exact_mut(size_of::<f64>()).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObservaError;

    #[test]
    fn test_memory_store_read() {
        let mut store = MemoryStore::new();
        store.insert("a", vec![1u8, 2, 3, 4]);
        assert_eq!(store.len(), 1);

        let mut buf = [0u8; 4];
        assert!(store.read("a", &mut buf));
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_memory_store_miss_leaves_buffer() {
        let mut store = MemoryStore::new();
        store.insert("short", vec![9u8; 3]);

        let mut buf = [7u8; 4];
        assert!(!store.read("missing", &mut buf));
        assert!(!store.read("short", &mut buf));
        assert_eq!(buf, [7u8; 4]);
    }

    #[test]
    fn test_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buckets.json");
        fs::write(&path, r#"{ "k": [1.5, -2.0], "bad": [1.0] }"#).unwrap();

        let store = JsonStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        let mut keys: Vec<&str> = store.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["bad", "k"]);

        let mut buf = [0u8; 16];
        assert!(store.read("k", &mut buf));
        assert_eq!(&buf[..8], &1.5f64.to_le_bytes());
        assert_eq!(&buf[8..], &(-2.0f64).to_le_bytes());

        let mut untouched = [0xAAu8; 16];
        assert!(!store.read("bad", &mut untouched));
        assert!(!store.read("none", &mut untouched));
        assert_eq!(untouched, [0xAAu8; 16]);
    }

    #[test]
    fn test_json_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            JsonStore::open(dir.path().join("missing.json")),
            Err(ObservaError::Store(StoreError::Read { .. }))
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "k": "not numbers" }"#).unwrap();
        assert!(matches!(
            JsonStore::open(&path),
            Err(ObservaError::Store(StoreError::Parse { .. }))
        ));
    }
}
