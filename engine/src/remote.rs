//! The remote store boundary: transport trait, translating client, and an
//! in-memory implementation.
//!
//! [`RemoteStore`] is the raw transport: it speaks remote form (snake_case
//! rows) and knows nothing about collection keys. [`RemoteClient`] sits on
//! top, owns the key → table mapping, runs every payload through the schema
//! translator, and turns the unconfigured case into a value instead of a
//! fault. Expected network failures never escape this module as panics.

use crate::error::{RemoteError, RemoteResult};
use crate::translate;
use crate::{CollectionKey, TableName};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The record field used as the upsert conflict target. The remote store is
/// expected to hold a uniqueness constraint on it.
pub const CONFLICT_KEY: &str = "id";

/// Kind of change observed on a remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single change delivered over a table subscription.
///
/// `record` carries the new row for inserts and updates and the old row for
/// deletes, in remote form. Delivery is at-least-once and unordered across
/// distinct records.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub kind: ChangeKind,
    pub table: TableName,
    pub record: Option<Value>,
}

/// A live change feed for one remote table.
///
/// Dropping the subscription unsubscribes. A channel dropped by the remote
/// side is not reconnected automatically; [`Subscription::next`] returning
/// `None` is final.
pub struct Subscription {
    id: String,
    receiver: mpsc::UnboundedReceiver<RemoteChange>,
}

impl Subscription {
    /// Build a subscription around a change receiver. Transport
    /// implementations hold the sending half.
    pub fn new(receiver: mpsc::UnboundedReceiver<RemoteChange>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            receiver,
        }
    }

    /// Unique identifier for this subscription.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next change. `None` means the channel closed for good.
    pub async fn next(&mut self) -> Option<RemoteChange> {
        self.receiver.recv().await
    }
}

/// Raw transport to the remote durable store.
///
/// All payloads are in remote form. Every method converts expected failures
/// into [`RemoteError`] values; implementations must not panic on network
/// conditions. Timeouts are the transport's own concern, the engine enforces
/// none.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whole-record insert-or-overwrite of `rows`, keyed by `conflict_key`.
    /// No partial-field patching.
    async fn upsert(&self, table: &str, rows: Vec<Value>, conflict_key: &str) -> RemoteResult<()>;

    /// All rows of `table`, optionally constrained by equality `filters`
    /// (remote-form field name, required value).
    async fn select_all(&self, table: &str, filters: &[(String, Value)]) -> RemoteResult<Vec<Value>>;

    /// Delete the row whose conflict key equals `key`. Idempotent: deleting
    /// an absent key is not an error.
    async fn delete_by_key(&self, table: &str, key: &str) -> RemoteResult<()>;

    /// Open a push channel for every insert/update/delete on `table`.
    fn subscribe(&self, table: &str) -> RemoteResult<Subscription>;

    /// Cheap reachability probe.
    async fn ping(&self) -> RemoteResult<()>;
}

/// Outcome of a [`RemoteClient::health_check`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub healthy: bool,
    pub latency: Option<Duration>,
    pub error: Option<String>,
}

/// Translating, mapping-aware client over an optional [`RemoteStore`].
///
/// `store == None` models the unconfigured deployment: every call reports
/// [`RemoteError::NotConfigured`] and the engine degrades to local-only mode.
pub struct RemoteClient {
    store: Option<Arc<dyn RemoteStore>>,
    tables: BTreeMap<CollectionKey, TableName>,
}

impl RemoteClient {
    /// Build a client over `store` with a collection key → table mapping.
    pub fn new(
        store: Option<Arc<dyn RemoteStore>>,
        tables: BTreeMap<CollectionKey, TableName>,
    ) -> Self {
        Self { store, tables }
    }

    /// Whether a remote store was supplied at all.
    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// The remote table mapped to `key`, if any.
    pub fn table_for(&self, key: &str) -> Option<&str> {
        self.tables.get(key).map(String::as_str)
    }

    fn backend(&self, key: &str) -> RemoteResult<(&Arc<dyn RemoteStore>, &str)> {
        let store = self.store.as_ref().ok_or(RemoteError::NotConfigured)?;
        let table = self
            .tables
            .get(key)
            .ok_or_else(|| RemoteError::Unmapped(key.to_string()))?;
        Ok((store, table))
    }

    /// Upsert local-form `records` into the table mapped to `key`.
    pub async fn upsert(&self, key: &str, records: &[Value]) -> RemoteResult<()> {
        let (store, table) = self.backend(key)?;
        let rows = records.iter().map(translate::to_remote_form).collect();
        store.upsert(table, rows, CONFLICT_KEY).await
    }

    /// Fetch all rows for `key`, translated back to local form. Filter field
    /// names are given in local form and translated on the way out.
    pub async fn select_all(
        &self,
        key: &str,
        filters: &[(String, Value)],
    ) -> RemoteResult<Vec<Value>> {
        let (store, table) = self.backend(key)?;
        let filters: Vec<(String, Value)> = filters
            .iter()
            .map(|(field, value)| (translate::to_remote_key(field), value.clone()))
            .collect();
        let rows = store.select_all(table, &filters).await?;
        Ok(rows.iter().map(translate::to_local_form).collect())
    }

    /// Delete the record identified by `id` from the table mapped to `key`.
    pub async fn delete_by_key(&self, key: &str, id: &str) -> RemoteResult<()> {
        let (store, table) = self.backend(key)?;
        store.delete_by_key(table, id).await
    }

    /// Open a change subscription for the table mapped to `key`.
    pub fn subscribe(&self, key: &str) -> RemoteResult<Subscription> {
        let (store, table) = self.backend(key)?;
        store.subscribe(table)
    }

    /// Probe the remote store, measuring the round trip.
    pub async fn health_check(&self) -> HealthReport {
        let Some(store) = self.store.as_ref() else {
            return HealthReport {
                healthy: false,
                latency: None,
                error: Some(RemoteError::NotConfigured.to_string()),
            };
        };

        let start = Instant::now();
        match store.ping().await {
            Ok(()) => HealthReport {
                healthy: true,
                latency: Some(start.elapsed()),
                error: None,
            },
            Err(err) => HealthReport {
                healthy: false,
                latency: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// In-memory [`RemoteStore`] for tests and local development.
///
/// Rows are held in remote form keyed by table and conflict key. Changes are
/// fanned out to subscribers; dead channels are pruned on the next send. The
/// offline toggle makes every call fail with a transport error, simulating a
/// network outage.
#[derive(Default)]
pub struct MemoryRemote {
    tables: DashMap<String, BTreeMap<String, Value>>,
    subscribers: DashMap<String, Vec<mpsc::UnboundedSender<RemoteChange>>>,
    offline: AtomicBool,
    upsert_calls: AtomicUsize,
}

impl MemoryRemote {
    /// Create an empty remote store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty remote store wrapped in `Arc` for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Toggle simulated connectivity loss.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of upsert calls served (batches, not rows).
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of all rows in `table`, in remote form.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Insert a row as if another device had written it, notifying
    /// subscribers. The row must be in remote form.
    pub fn insert_row(&self, table: &str, row: Value) {
        let Some(id) = row.get(CONFLICT_KEY).and_then(Value::as_str).map(str::to_owned) else {
            return;
        };
        let kind = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            if rows.insert(id, row.clone()).is_some() {
                ChangeKind::Update
            } else {
                ChangeKind::Insert
            }
        };
        self.broadcast(
            table,
            RemoteChange {
                kind,
                table: table.to_string(),
                record: Some(row),
            },
        );
    }

    fn check_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("remote store unreachable".into()))
        } else {
            Ok(())
        }
    }

    fn broadcast(&self, table: &str, change: RemoteChange) {
        if let Some(mut senders) = self.subscribers.get_mut(table) {
            senders.retain(|sender| sender.send(change.clone()).is_ok());
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert(&self, table: &str, rows: Vec<Value>, conflict_key: &str) -> RemoteResult<()> {
        self.check_online()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let mut changes = Vec::with_capacity(rows.len());
        {
            let mut stored = self.tables.entry(table.to_string()).or_default();
            for row in rows {
                let id = row
                    .get(conflict_key)
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        RemoteError::Transport(format!("row missing conflict key '{conflict_key}'"))
                    })?;
                let kind = if stored.insert(id, row.clone()).is_some() {
                    ChangeKind::Update
                } else {
                    ChangeKind::Insert
                };
                changes.push(RemoteChange {
                    kind,
                    table: table.to_string(),
                    record: Some(row),
                });
            }
        }
        for change in changes {
            self.broadcast(table, change);
        }
        Ok(())
    }

    async fn select_all(&self, table: &str, filters: &[(String, Value)]) -> RemoteResult<Vec<Value>> {
        self.check_online()?;
        let rows = self.rows(table);
        Ok(rows
            .into_iter()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(field, expected)| row.get(field) == Some(expected))
            })
            .collect())
    }

    async fn delete_by_key(&self, table: &str, key: &str) -> RemoteResult<()> {
        self.check_online()?;
        let removed = self
            .tables
            .get_mut(table)
            .and_then(|mut rows| rows.remove(key));
        if let Some(row) = removed {
            self.broadcast(
                table,
                RemoteChange {
                    kind: ChangeKind::Delete,
                    table: table.to_string(),
                    record: Some(row),
                },
            );
        }
        Ok(())
    }

    fn subscribe(&self, table: &str) -> RemoteResult<Subscription> {
        self.check_online()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .entry(table.to_string())
            .or_default()
            .push(sender);
        Ok(Subscription::new(receiver))
    }

    async fn ping(&self) -> RemoteResult<()> {
        self.check_online()
    }
}
