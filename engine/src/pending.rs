//! The pending-write queue: a durable record of writes the remote store has
//! not yet confirmed.
//!
//! The queue holds identifiers, not payloads. A retry always re-reads the
//! identifier's current value from the local cache, so a record mutated again
//! before the retry uploads its latest state rather than the one that
//! originally failed.

use crate::store::LocalStore;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Metadata key under which the queue is persisted as a single JSON blob.
pub const PENDING_META_KEY: &str = "pending_writes";

type Entries = BTreeMap<String, BTreeSet<String>>;

/// Durable map of collection key → identifiers awaiting a successful upsert.
///
/// Every mutation is persisted through the local store immediately, so the
/// queue survives a process restart.
pub struct PendingQueue {
    local: Arc<dyn LocalStore>,
    entries: Mutex<Entries>,
}

impl PendingQueue {
    /// Restore the queue from the persisted blob, read once at startup.
    ///
    /// A malformed blob is discarded with a warning; startup never fails on
    /// cache-layer garbage.
    pub fn restore(local: Arc<dyn LocalStore>) -> Self {
        let entries = match local.read_meta(PENDING_META_KEY) {
            Some(blob) => match serde_json::from_str::<Entries>(&blob) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(%err, "discarding malformed pending-write blob");
                    Entries::new()
                }
            },
            None => Entries::new(),
        };

        Self {
            local,
            entries: Mutex::new(entries),
        }
    }

    /// Record a failed write for later retry.
    pub fn mark(&self, key: &str, id: &str) {
        let mut entries = self.entries.lock();
        entries
            .entry(key.to_string())
            .or_default()
            .insert(id.to_string());
        self.persist(&entries);
    }

    /// Drop an identifier, either because its write finally succeeded or
    /// because a local delete superseded it.
    pub fn remove(&self, key: &str, id: &str) {
        let mut entries = self.entries.lock();
        if let Some(ids) = entries.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                entries.remove(key);
            }
            self.persist(&entries);
        }
    }

    /// Collection keys that currently have pending identifiers.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Pending identifiers for one collection.
    pub fn ids_for(&self, key: &str) -> Vec<String> {
        self.entries
            .lock()
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a specific identifier is pending.
    pub fn contains(&self, key: &str, id: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Total pending identifiers across all collections.
    pub fn total(&self) -> usize {
        self.entries.lock().values().map(BTreeSet::len).sum()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn persist(&self, entries: &Entries) {
        match serde_json::to_string(entries) {
            Ok(blob) => self.local.write_meta(PENDING_META_KEY, &blob),
            Err(err) => tracing::warn!(%err, "failed to serialize pending-write queue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn mark_persists_immediately() {
        let store = MemoryStore::new_shared();
        let queue = PendingQueue::restore(store.clone() as Arc<dyn LocalStore>);

        queue.mark("students", "s1");
        queue.mark("students", "s2");
        queue.mark("staff", "t1");

        let blob = store.read_meta(PENDING_META_KEY).unwrap();
        assert_eq!(blob, r#"{"staff":["t1"],"students":["s1","s2"]}"#);
    }

    #[test]
    fn survives_restart() {
        let store = MemoryStore::new_shared();
        {
            let queue = PendingQueue::restore(store.clone() as Arc<dyn LocalStore>);
            queue.mark("students", "s1");
        }

        let restored = PendingQueue::restore(store as Arc<dyn LocalStore>);
        assert!(restored.contains("students", "s1"));
        assert_eq!(restored.total(), 1);
    }

    #[test]
    fn remove_prunes_empty_keys() {
        let store = MemoryStore::new_shared();
        let queue = PendingQueue::restore(store.clone() as Arc<dyn LocalStore>);

        queue.mark("students", "s1");
        queue.remove("students", "s1");

        assert!(queue.is_empty());
        assert!(queue.keys().is_empty());
        assert_eq!(store.read_meta(PENDING_META_KEY).unwrap(), "{}");
    }

    #[test]
    fn marking_twice_keeps_one_entry() {
        let store = MemoryStore::new_shared();
        let queue = PendingQueue::restore(store as Arc<dyn LocalStore>);

        queue.mark("students", "s1");
        queue.mark("students", "s1");
        assert_eq!(queue.total(), 1);
    }

    #[test]
    fn malformed_blob_yields_empty_queue() {
        let store = MemoryStore::new_shared();
        store.write_meta(PENDING_META_KEY, "not json at all {{");

        let queue = PendingQueue::restore(store as Arc<dyn LocalStore>);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_unknown_is_a_no_op() {
        let store = MemoryStore::new_shared();
        let queue = PendingQueue::restore(store as Arc<dyn LocalStore>);
        queue.remove("students", "ghost");
        assert!(queue.is_empty());
    }
}
