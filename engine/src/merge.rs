//! Last-write-wins merge of a local and a remote collection snapshot.
//!
//! This is a deliberate trade-off: compared to per-field merging or vector
//! clocks, last-write-wins guarantees convergence for multiple offline
//! writers at the cost of possibly discarding one side of a truly concurrent
//! edit.

use crate::record;
use serde_json::Value;
use std::collections::HashMap;

/// Merge two snapshots of the same collection.
///
/// Every local record seeds the result, keyed by identifier. A remote record
/// is inserted when absent locally; when present on both sides the record
/// with the later `updatedAt` wins, with ties going to the remote side
/// (`remote_ts >= local_ts`). A missing timestamp counts as the Unix epoch.
///
/// The order of the returned records is unspecified; callers must not depend
/// on it.
pub fn merge(local: &[Value], remote: &[Value]) -> Vec<Value> {
    let mut merged: Vec<Value> = local.to_vec();
    let mut index: HashMap<String, usize> = HashMap::with_capacity(merged.len());
    for (position, item) in merged.iter().enumerate() {
        if let Some(id) = record::id_of(item) {
            index.insert(id.to_string(), position);
        }
    }

    for item in remote {
        let Some(id) = record::id_of(item) else {
            continue;
        };
        match index.get(id) {
            Some(&position) => {
                if record::updated_at(item) >= record::updated_at(&merged[position]) {
                    merged[position] = item.clone();
                }
            }
            None => {
                index.insert(id.to_string(), merged.len());
                merged.push(item.clone());
            }
        }
    }

    merged
}
