//! # Sprout Engine
//!
//! Offline-first data synchronization for the Sprout kindergarten
//! management app.
//!
//! The engine keeps an on-device record cache consistent with a remote
//! durable store under intermittent connectivity, without losing writes or
//! duplicating them. Domain record shapes, authentication, and UI concerns
//! live outside this crate; callers go through the CRUD-like surface of
//! [`SyncEngine`].
//!
//! ## Design Principles
//!
//! - **Local first**: every write lands in the local cache synchronously
//!   before any network call; reads are served remote-fresh when possible
//!   and local-fresh otherwise, and never fail visibly.
//! - **Failures are values**: expected remote failures are converted into
//!   [`RemoteError`] values at the [`RemoteClient`] boundary and surface as
//!   [`RemoteWriteStatus`] on writes. Nothing in this crate is fatal.
//! - **No lost writes**: a failed upsert is recorded in the durable
//!   [`PendingQueue`] until it succeeds or is superseded.
//! - **One instance, no globals**: all state hangs off a single
//!   [`SyncEngine`] constructed per process, so independent engines can run
//!   side by side in tests.
//!
//! ## Core Concepts
//!
//! ### Records and Collections
//!
//! Records are schemaless JSON objects carrying an `"id"` and, usually, an
//! `"updatedAt"` ISO-8601 timestamp. Collections are named record sets; a
//! fixed mapping in [`SyncConfig`] ties each synchronized collection to one
//! remote table. Unmapped collections are local-only.
//!
//! ### Field-name translation
//!
//! Local records use camelCase, the remote store uses snake_case. The
//! [`translate`] module rewrites keys recursively in both directions at the
//! wire boundary.
//!
//! ### Conflict resolution
//!
//! [`merge`] reconciles a local and a remote snapshot with
//! last-write-wins-by-timestamp: the later `updatedAt` survives, remote
//! winning ties. Convergent for multiple offline writers, at the cost of
//! possibly dropping one side of a truly concurrent edit.
//!
//! ### Push strategies
//!
//! [`PushMode::Immediate`] upserts on every save; [`PushMode::Debounced`]
//! coalesces rapid local writes into one batched upsert per collection once
//! a quiescence window elapses.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sprout_engine::{MemoryRemote, MemoryStore, SyncConfig, SyncEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = SyncConfig::new([("students", "students")]);
//! let engine = SyncEngine::new(
//!     config,
//!     MemoryStore::new_shared(),
//!     Some(MemoryRemote::new_shared()),
//! );
//!
//! engine
//!     .save_item("students", json!({"id": "s1", "fullName": "Alice"}))
//!     .await;
//! let students = engine.load_collection("students", &[]).await;
//! assert_eq!(students.len(), 1);
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The engine is event-driven and cooperative: timers, network completions,
//! connectivity transitions, and subscription callbacks. Every remote call
//! is a suspension point; local cache access is synchronous. It runs
//! unchanged on a current-thread or multi-thread Tokio runtime.

pub mod config;
pub mod controller;
pub mod error;
pub mod merge;
pub mod pending;
pub mod record;
pub mod remote;
pub mod store;
pub mod translate;

// Re-export main types at crate root
pub use config::{PushMode, SyncConfig, DEFAULT_DEBOUNCE_WINDOW};
pub use controller::{
    BulkReport, ChangeNotice, CollectionOutcome, RemoteWriteStatus, SyncEngine, SyncStatus,
    LAST_SYNC_META_KEY,
};
pub use error::{RemoteError, RemoteResult};
pub use merge::merge;
pub use pending::{PendingQueue, PENDING_META_KEY};
pub use remote::{
    ChangeKind, HealthReport, MemoryRemote, RemoteChange, RemoteClient, RemoteStore, Subscription,
    CONFLICT_KEY,
};
pub use store::{LocalStore, MemoryStore};
pub use translate::{to_local_form, to_remote_form};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionKey = String;
pub type TableName = String;
