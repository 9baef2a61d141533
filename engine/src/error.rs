//! Error types for the Sprout sync engine.
//!
//! Nothing in this crate is fatal. Remote failures are converted into values
//! at the [`crate::remote::RemoteClient`] boundary; callers decide whether to
//! serve stale local data, queue a retry, or just log.

use thiserror::Error;

/// All expected remote-side failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No remote store was supplied. An expected condition: the engine
    /// degrades to local-only mode without treating it as a fault.
    #[error("remote store is not configured")]
    NotConfigured,

    /// The collection key has no remote table; such collections are
    /// local-only and never synchronized.
    #[error("collection has no remote table: {0}")]
    Unmapped(String),

    /// A remote call failed while the store was configured. Always caught
    /// and reported as a value, never propagated as a panic.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A subscription channel closed and will not be reopened automatically.
    #[error("subscription channel closed")]
    ChannelClosed,
}

impl RemoteError {
    /// Returns true for failures that a later retry could resolve.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transport(_) | RemoteError::ChannelClosed)
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            RemoteError::NotConfigured.to_string(),
            "remote store is not configured"
        );
        assert_eq!(
            RemoteError::Unmapped("drafts".into()).to_string(),
            "collection has no remote table: drafts"
        );
        assert_eq!(
            RemoteError::Transport("connection refused".into()).to_string(),
            "transport failure: connection refused"
        );
    }

    #[test]
    fn transience() {
        assert!(RemoteError::Transport("timeout".into()).is_transient());
        assert!(!RemoteError::NotConfigured.is_transient());
        assert!(!RemoteError::Unmapped("x".into()).is_transient());
    }
}
