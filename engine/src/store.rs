//! The local cache: the on-device record store.
//!
//! Reads are synchronous and authoritative; every write call in the engine
//! lands here before anything is attempted remotely (read-your-write). The
//! engine performs no file IO of its own: the persistence medium behind this
//! trait is supplied by the embedder (a mobile key-value store, a file, or
//! plain memory in tests).

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Synchronous on-device storage for collections and small metadata strings.
///
/// Implementations must be infallible: storage-layer problems are theirs to
/// absorb, reads fall back to empty. None of the methods may block on IO for
/// any significant time, since the engine calls them while servicing async
/// events.
pub trait LocalStore: Send + Sync {
    /// All records currently cached under `key`. Unknown keys yield an empty
    /// collection.
    fn read(&self, key: &str) -> Vec<Value>;

    /// Replace the whole collection under `key`.
    fn write(&self, key: &str, records: &[Value]);

    /// Read a metadata string (pending-write blob, last sync time).
    fn read_meta(&self, key: &str) -> Option<String>;

    /// Write a metadata string.
    fn write_meta(&self, key: &str, value: &str);
}

/// In-memory [`LocalStore`] used by tests and as a default for embedders
/// that persist state some other way.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    meta: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in `Arc` for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl LocalStore for MemoryStore {
    fn read(&self, key: &str) -> Vec<Value> {
        self.collections.lock().get(key).cloned().unwrap_or_default()
    }

    fn write(&self, key: &str, records: &[Value]) {
        self.collections
            .lock()
            .insert(key.to_string(), records.to_vec());
    }

    fn read_meta(&self, key: &str) -> Option<String> {
        self.meta.lock().get(key).cloned()
    }

    fn write_meta(&self, key: &str, value: &str) {
        self.meta.lock().insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_key_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read("students").is_empty());
        assert_eq!(store.read_meta("last_sync_time"), None);
    }

    #[test]
    fn write_then_read() {
        let store = MemoryStore::new();
        let records = vec![json!({"id": "s1"}), json!({"id": "s2"})];

        store.write("students", &records);
        assert_eq!(store.read("students"), records);

        store.write("students", &records[..1]);
        assert_eq!(store.read("students").len(), 1);
    }

    #[test]
    fn meta_roundtrip() {
        let store = MemoryStore::new();
        store.write_meta("last_sync_time", "2024-01-01T00:00:00.000Z");
        assert_eq!(
            store.read_meta("last_sync_time").as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }
}
