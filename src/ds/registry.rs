//! Per-key access registry feeding feature extraction.
//!
//! [`AccessRegistry`] keeps one [`WindowedAccessTracker`] per cache key on a
//! shared logical clock and snapshots ordered batches of [`HistoryPair`]s,
//! which is exactly the input [`extract_features`](crate::features::extract_features)
//! expects.
//!
//! ## Example Usage
//!
//! ```
//! use staleness::ds::AccessRegistry;
//! use staleness::features::extract_features;
//!
//! let mut registry: AccessRegistry<&str> = AccessRegistry::new(200);
//! registry.record_read("user:1", 1);
//! registry.record_write("user:2", 3);
//! registry.record_read("user:1", 4);
//! registry.advance_to(10);
//!
//! let keys = ["user:2", "user:1", "user:3"];
//! let batch = registry.snapshot(&keys);
//! let table = extract_features(&batch).unwrap();
//!
//! assert_eq!(table.len(), 3);
//! assert_eq!(table.get(1).unwrap().read.window_counts, [2, 2, 2, 2]);
//! assert_eq!(table.get(2).unwrap().read.gap_filled(), 0);
//! ```

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::access_history::HistoryPair;
use crate::ds::access_tracker::{AccessTracker, WindowedAccessTracker};

/// Map of cache keys to windowed trackers on one logical clock.
#[derive(Debug, Clone)]
pub struct AccessRegistry<K> {
    trackers: FxHashMap<K, WindowedAccessTracker>,
    window_bits: usize,
    now: u64,
}

impl<K> AccessRegistry<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry whose trackers remember `window_bits` steps.
    pub fn new(window_bits: usize) -> Self {
        Self::with_capacity(window_bits, 0)
    }

    /// Creates an empty registry with room for `capacity` keys.
    pub fn with_capacity(window_bits: usize, capacity: usize) -> Self {
        Self {
            trackers: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            window_bits,
            now: 0,
        }
    }

    /// Returns the tracked window in steps.
    pub fn window_bits(&self) -> usize {
        self.window_bits
    }

    /// Returns the latest step seen by the registry.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.trackers.contains_key(key)
    }

    /// Records a read of `key` at `step`.
    pub fn record_read(&mut self, key: K, step: u64) {
        self.now = self.now.max(step);
        self.tracker_mut(key).record_read(step);
    }

    /// Records a write of `key` at `step`.
    pub fn record_write(&mut self, key: K, step: u64) {
        self.now = self.now.max(step);
        self.tracker_mut(key).record_write(step);
    }

    /// Moves the registry clock forward. Trackers catch up lazily on snapshot.
    pub fn advance_to(&mut self, step: u64) {
        self.now = self.now.max(step);
    }

    /// Stops tracking `key`, returning its last history.
    pub fn remove(&mut self, key: &K) -> Option<HistoryPair> {
        let now = self.now;
        self.trackers.remove(key).map(|mut tracker| {
            tracker.sync_time_step(now);
            tracker.history_pair()
        })
    }

    /// Returns the history of `key` as of the registry clock.
    pub fn history(&self, key: &K) -> Option<HistoryPair> {
        self.trackers.get(key).map(|tracker| self.synced(tracker))
    }

    /// Returns histories for `keys` in the given order.
    ///
    /// Unknown keys yield idle histories of the registry's window, so the
    /// output always has `keys.len()` entries.
    pub fn snapshot(&self, keys: &[K]) -> Vec<HistoryPair> {
        keys.iter()
            .map(|key| {
                self.history(key)
                    .unwrap_or_else(|| WindowedAccessTracker::new(self.window_bits).history_pair())
            })
            .collect()
    }

    /// Returns every tracked key with its history. Order is unspecified.
    pub fn snapshot_all(&self) -> Vec<(K, HistoryPair)> {
        self.trackers
            .iter()
            .map(|(key, tracker)| (key.clone(), self.synced(tracker)))
            .collect()
    }

    fn tracker_mut(&mut self, key: K) -> &mut WindowedAccessTracker {
        let window_bits = self.window_bits;
        self.trackers
            .entry(key)
            .or_insert_with(|| WindowedAccessTracker::new(window_bits))
    }

    fn synced(&self, tracker: &WindowedAccessTracker) -> HistoryPair {
        if tracker.last_update_step() == self.now {
            return tracker.history_pair();
        }
        let mut copy = tracker.clone();
        copy.sync_time_step(self.now);
        copy.history_pair()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_key_order() {
        let mut registry = AccessRegistry::new(64);
        registry.record_read(1u64, 1);
        registry.record_read(2u64, 2);
        registry.record_read(2u64, 3);

        let batch = registry.snapshot(&[2, 1]);
        assert_eq!(batch[0].read.access_count(), 2);
        assert_eq!(batch[1].read.access_count(), 1);
    }

    #[test]
    fn snapshot_syncs_to_registry_clock() {
        let mut registry = AccessRegistry::new(128);
        registry.record_write("k", 5);
        registry.record_read("other", 9);

        let pair = registry.history(&"k").unwrap();
        assert_eq!(pair.write.most_recent_access(), Some(4));
    }

    #[test]
    fn snapshot_unknown_key_is_idle() {
        let registry: AccessRegistry<&str> = AccessRegistry::new(200);
        let batch = registry.snapshot(&["missing"]);
        assert_eq!(batch.len(), 1);
        assert!(batch[0].read.is_idle());
        assert!(batch[0].write.is_idle());
        assert_eq!(batch[0].read.window_bits(), 200);
    }

    #[test]
    fn advance_ages_every_key() {
        let mut registry = AccessRegistry::new(64);
        registry.record_read("a", 0);
        registry.advance_to(63);
        assert!(registry.history(&"a").unwrap().read.accessed_at(63));
        registry.advance_to(64);
        assert!(registry.history(&"a").unwrap().read.is_idle());
    }

    #[test]
    fn remove_returns_synced_history() {
        let mut registry = AccessRegistry::new(64);
        registry.record_read("a", 2);
        registry.advance_to(12);

        let pair = registry.remove(&"a").unwrap();
        assert_eq!(pair.read.most_recent_access(), Some(10));
        assert!(!registry.contains(&"a"));
        assert!(registry.is_empty());
        assert!(registry.remove(&"a").is_none());
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut registry = AccessRegistry::new(64);
        registry.advance_to(50);
        registry.record_read("a", 10);
        assert_eq!(registry.now(), 50);
    }

    #[test]
    fn snapshot_all_covers_every_key() {
        let mut registry = AccessRegistry::with_capacity(64, 4);
        for key in 0..4u32 {
            registry.record_write(key, u64::from(key));
        }
        let mut all = registry.snapshot_all();
        all.sort_by_key(|(key, _)| *key);
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].1.write.most_recent_access(), Some(3));
        assert_eq!(all[3].1.write.most_recent_access(), Some(0));
    }
}
