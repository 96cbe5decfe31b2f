//! Crash/reload recovery for running timers.
//!
//! A timer checkpoints itself into a [`SnapshotStore`] after each command and
//! tick. On reopen, [`decide_recovery`] turns the stored record plus the
//! current wall-clock time into a [`Recovery`] decision. Store failures are
//! reported but never block timer operation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ItemId;

/// Persisted state of one timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub item_id: ItemId,
    pub elapsed_secs: i64,
    pub running: bool,
    pub has_started: bool,
    pub snapshot_at: DateTime<Utc>,
}

/// Outcome of applying a snapshot at reopen time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recovery {
    /// The timer was running recently; the gap counts as elapsed time.
    Resumed { elapsed_secs: i64, gap_secs: i64 },
    /// The timer comes back paused at its stored elapsed count.
    ///
    /// `stale` is set when it was running but the gap exceeded the bound.
    Paused { elapsed_secs: i64, stale: bool },
    /// Nothing to restore.
    Fresh,
}

/// Decides how a timer resumes from a snapshot.
///
/// A running snapshot younger than `staleness_secs` resumes running with the
/// gap added. Anything else that had started resumes paused. A clock that
/// went backwards counts as a zero gap.
pub fn decide_recovery(snapshot: &TimerSnapshot, now: DateTime<Utc>, staleness_secs: i64) -> Recovery {
    let gap_secs = (now - snapshot.snapshot_at).num_seconds().max(0);
    if snapshot.running && gap_secs < staleness_secs {
        Recovery::Resumed {
            elapsed_secs: snapshot.elapsed_secs.saturating_add(gap_secs),
            gap_secs,
        }
    } else if snapshot.running || snapshot.has_started {
        Recovery::Paused {
            elapsed_secs: snapshot.elapsed_secs,
            stale: snapshot.running,
        }
    } else {
        Recovery::Fresh
    }
}

/// Errors from a snapshot backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corrupt snapshot for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Storage key for an item's snapshot.
pub fn snapshot_key(item_id: &ItemId) -> String {
    format!("timer_{item_id}")
}

/// Key-value persistence for timer snapshots.
pub trait SnapshotStore {
    /// Writes (or overwrites) the snapshot for its item.
    fn save_snapshot(&mut self, snapshot: &TimerSnapshot) -> Result<(), StoreError>;

    fn load_snapshot(&self, item_id: &ItemId) -> Result<Option<TimerSnapshot>, StoreError>;

    /// Removes an item's snapshot. Missing snapshots are not an error.
    fn delete_snapshot(&mut self, item_id: &ItemId) -> Result<(), StoreError>;

    /// All stored snapshots, ordered by item id.
    fn list_snapshots(&self) -> Result<Vec<TimerSnapshot>, StoreError>;
}

/// In-process store. Holds JSON text per key, the same shape a browser
/// local-storage backend would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores raw text under a key, bypassing serialization.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl SnapshotStore for MemoryStore {
    fn save_snapshot(&mut self, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot).map_err(|e| StoreError::Backend(Box::new(e)))?;
        self.entries.insert(snapshot_key(&snapshot.item_id), json);
        Ok(())
    }

    fn load_snapshot(&self, item_id: &ItemId) -> Result<Option<TimerSnapshot>, StoreError> {
        let key = snapshot_key(item_id);
        self.entries
            .get(&key)
            .map(|json| {
                serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
                    key: key.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn delete_snapshot(&mut self, item_id: &ItemId) -> Result<(), StoreError> {
        self.entries.remove(&snapshot_key(item_id));
        Ok(())
    }

    fn list_snapshots(&self) -> Result<Vec<TimerSnapshot>, StoreError> {
        let mut snapshots = self
            .entries
            .iter()
            .map(|(key, json)| {
                serde_json::from_str::<TimerSnapshot>(json).map_err(|e| StoreError::Corrupt {
                    key: key.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        snapshots.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap()
    }

    fn snapshot(elapsed: i64, running: bool, has_started: bool) -> TimerSnapshot {
        TimerSnapshot {
            item_id: ItemId::new("item-1").unwrap(),
            elapsed_secs: elapsed,
            running,
            has_started,
            snapshot_at: at(19, 30, 0),
        }
    }

    #[test]
    fn running_within_bound_adds_gap() {
        let snap = snapshot(100, true, true);
        let recovery = decide_recovery(&snap, at(19, 31, 0), 300);
        assert_eq!(recovery, Recovery::Resumed { elapsed_secs: 160, gap_secs: 60 });
    }

    #[test]
    fn gap_at_bound_resumes_paused() {
        let snap = snapshot(100, true, true);
        let recovery = decide_recovery(&snap, at(19, 35, 0), 300);
        assert_eq!(recovery, Recovery::Paused { elapsed_secs: 100, stale: true });
    }

    #[test]
    fn paused_snapshot_stays_paused() {
        let snap = snapshot(42, false, true);
        let recovery = decide_recovery(&snap, at(19, 30, 5), 300);
        assert_eq!(recovery, Recovery::Paused { elapsed_secs: 42, stale: false });
    }

    #[test]
    fn never_started_is_fresh() {
        let snap = snapshot(0, false, false);
        assert_eq!(decide_recovery(&snap, at(19, 30, 5), 300), Recovery::Fresh);
    }

    #[test]
    fn clock_skew_counts_as_zero_gap() {
        let snap = snapshot(100, true, true);
        let earlier = snap.snapshot_at - Duration::seconds(30);
        assert_eq!(
            decide_recovery(&snap, earlier, 300),
            Recovery::Resumed { elapsed_secs: 100, gap_secs: 0 }
        );
    }

    #[test]
    fn memory_store_save_load_delete() {
        let mut store = MemoryStore::new();
        let snap = snapshot(10, true, true);
        store.save_snapshot(&snap).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load_snapshot(&snap.item_id).unwrap(), Some(snap.clone()));

        store.delete_snapshot(&snap.item_id).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.load_snapshot(&snap.item_id).unwrap(), None);
        store.delete_snapshot(&snap.item_id).unwrap();
    }

    #[test]
    fn memory_store_overwrites_per_item() {
        let mut store = MemoryStore::new();
        store.save_snapshot(&snapshot(10, true, true)).unwrap();
        store.save_snapshot(&snapshot(20, false, true)).unwrap();
        let listed = store.list_snapshots().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].elapsed_secs, 20);
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let mut store = MemoryStore::new();
        let id = ItemId::new("item-1").unwrap();
        store.insert_raw(snapshot_key(&id), "{not json");
        let err = store.load_snapshot(&id).unwrap_err();
        assert!(err.to_string().starts_with("corrupt snapshot for timer_item-1"));
    }

    #[test]
    fn snapshot_json_shape() {
        let json = serde_json::to_value(snapshot(5, true, true)).unwrap();
        assert_eq!(json["item_id"], "item-1");
        assert_eq!(json["elapsed_secs"], 5);
        assert_eq!(json["snapshot_at"], "2025-03-01T19:30:00Z");
    }
}
