//! Engine configuration.

use crate::{CollectionKey, TableName};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default quiescence window for debounced pushes.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// How local mutations reach the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushMode {
    /// Each `save_item` performs its own upsert immediately.
    #[default]
    Immediate,
    /// Mutations arm a per-collection debounce timer; one batched upsert of
    /// the whole collection runs once the window elapses with no further
    /// mutation.
    Debounced,
}

/// Configuration for a [`crate::controller::SyncEngine`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Collection key → remote table name. Keys absent from this map are
    /// local-only and never synchronized.
    pub tables: BTreeMap<CollectionKey, TableName>,
    /// Push strategy for local mutations.
    pub push_mode: PushMode,
    /// Quiescence window for [`PushMode::Debounced`].
    pub debounce_window: Duration,
}

impl SyncConfig {
    /// Build a configuration from a key → table mapping.
    pub fn new<K, T>(tables: impl IntoIterator<Item = (K, T)>) -> Self
    where
        K: Into<String>,
        T: Into<String>,
    {
        Self {
            tables: tables
                .into_iter()
                .map(|(key, table)| (key.into(), table.into()))
                .collect(),
            push_mode: PushMode::default(),
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }

    /// Builder-style push mode override.
    pub fn with_push_mode(mut self, mode: PushMode) -> Self {
        self.push_mode = mode;
        self
    }

    /// Builder-style debounce window override.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// The remote table mapped to `key`, if any.
    pub fn table_for(&self, key: &str) -> Option<&str> {
        self.tables.get(key).map(String::as_str)
    }

    /// All synchronized collection keys, in fixed (sorted) order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_lookup() {
        let config = SyncConfig::new([("students", "students"), ("mealPlans", "meal_plans")]);

        assert_eq!(config.table_for("mealPlans"), Some("meal_plans"));
        assert_eq!(config.table_for("drafts"), None);
    }

    #[test]
    fn keys_are_in_fixed_order() {
        let config = SyncConfig::new([("staff", "staff"), ("announcements", "announcements")]);
        let keys: Vec<&str> = config.keys().collect();
        assert_eq!(keys, vec!["announcements", "staff"]);
    }

    #[test]
    fn builder_overrides() {
        let config = SyncConfig::new([("students", "students")])
            .with_push_mode(PushMode::Debounced)
            .with_debounce_window(Duration::from_millis(50));

        assert_eq!(config.push_mode, PushMode::Debounced);
        assert_eq!(config.debounce_window, Duration::from_millis(50));
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::new([("students", "students")]);
        assert_eq!(config.push_mode, PushMode::Immediate);
        assert_eq!(config.debounce_window, DEFAULT_DEBOUNCE_WINDOW);
    }
}
