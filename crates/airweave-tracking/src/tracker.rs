//! Per-sync-job counters (spec §4.11, §5): one instance per job, updates
//! serialized through its own lock, reads are consistent snapshots.
//! Grounded on `platform/sync/state_publisher.py`'s `EntityTracker` reads
//! (`get_stats`, `get_named_counts`, `get_total_entities`).

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    pub kept: u64,
    pub skipped: u64,
}

impl Stats {
    pub fn total_operations(&self) -> u64 {
        self.inserted + self.updated + self.deleted + self.kept + self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Inserted,
    Updated,
    Deleted,
    Kept,
    Skipped,
}

#[derive(Default)]
struct Inner {
    stats: Stats,
    named_counts: HashMap<String, u64>,
}

/// Aggregate plus per-entity-type counters for a single sync job. `record`
/// is the only mutator, so the lock's critical section is always a handful
/// of integer increments.
pub struct Tracker {
    inner: Mutex<Inner>,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn record(&self, action: Action, entity_type_id: &str) {
        let mut inner = self.inner.lock();
        match action {
            Action::Inserted => inner.stats.inserted += 1,
            Action::Updated => inner.stats.updated += 1,
            Action::Deleted => inner.stats.deleted += 1,
            Action::Kept => inner.stats.kept += 1,
            Action::Skipped => inner.stats.skipped += 1,
        }
        *inner.named_counts.entry(entity_type_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_many(&self, action: Action, entity_type_id: &str, count: u64) {
        if count == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        match action {
            Action::Inserted => inner.stats.inserted += count,
            Action::Updated => inner.stats.updated += count,
            Action::Deleted => inner.stats.deleted += count,
            Action::Kept => inner.stats.kept += count,
            Action::Skipped => inner.stats.skipped += count,
        }
        *inner.named_counts.entry(entity_type_id.to_string()).or_insert(0) += count;
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().stats
    }

    pub fn named_counts(&self) -> HashMap<String, u64> {
        self.inner.lock().named_counts.clone()
    }

    pub fn total_entities(&self) -> u64 {
        self.inner.lock().named_counts.values().sum()
    }

    pub fn total_operations(&self) -> u64 {
        self.stats().total_operations()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_per_type_and_aggregate() {
        let tracker = Tracker::new();
        tracker.record(Action::Inserted, "doc");
        tracker.record(Action::Inserted, "doc");
        tracker.record(Action::Kept, "email");

        let stats = tracker.stats();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.total_operations(), 3);

        let named = tracker.named_counts();
        assert_eq!(named.get("doc"), Some(&2));
        assert_eq!(named.get("email"), Some(&1));
        assert_eq!(tracker.total_entities(), 3);
    }

    #[test]
    fn record_many_is_equivalent_to_repeated_record() {
        let tracker = Tracker::new();
        tracker.record_many(Action::Deleted, "doc", 5);
        assert_eq!(tracker.stats().deleted, 5);
        assert_eq!(tracker.named_counts().get("doc"), Some(&5));
    }
}
