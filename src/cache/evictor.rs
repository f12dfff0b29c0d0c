//! Evictor Module
//!
//! Trims an oversized shard down to a fraction of its threshold, dropping the
//! least recently touched entries first.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::ValueItem;

// == Eviction Policy ==
/// Size threshold and reduction target for a single shard.
///
/// A `max_slot_size` of zero disables eviction entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionPolicy {
    /// Entry count a shard may reach before it is trimmed
    pub max_slot_size: usize,
    /// Fraction of `max_slot_size` kept after trimming
    pub reduce_slot_size_rate: f64,
}

impl EvictionPolicy {
    pub fn new(max_slot_size: usize, reduce_slot_size_rate: f64) -> Self {
        Self {
            max_slot_size,
            reduce_slot_size_rate,
        }
    }

    /// Policy that never evicts.
    pub fn disabled() -> Self {
        Self::new(0, 1.0)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_slot_size > 0
    }

    // == Should Evict ==
    /// True when a shard holding `len` entries must be trimmed.
    pub fn should_evict(&self, len: usize) -> bool {
        self.is_enabled() && len > self.max_slot_size
    }

    // == Target Length ==
    /// Entry count a trimmed shard is reduced to:
    /// `floor(max_slot_size * reduce_slot_size_rate)`.
    pub fn target_len(&self) -> usize {
        (self.max_slot_size as f64 * self.reduce_slot_size_rate).floor() as usize
    }

    // == Evict ==
    /// Removes the oldest entries from `entries` until `target_len()` remain.
    ///
    /// Entries are ordered by recency marker, ties broken by key. Expiry is not
    /// consulted. Returns the number of entries removed.
    pub fn evict<K, V>(&self, entries: &mut HashMap<K, ValueItem<V>>) -> usize
    where
        K: Hash + Eq + Ord + Clone,
    {
        let target = self.target_len();
        let len = entries.len();
        if target >= len {
            return 0;
        }

        let excess = len - target;
        let mut order: Vec<(u64, &K)> = entries
            .iter()
            .map(|(key, item)| (item.recency(), key))
            .collect();

        // Only the `excess` oldest need to be ordered among themselves.
        if excess < order.len() {
            order.select_nth_unstable(excess - 1);
            order.truncate(excess);
        }

        let victims: Vec<K> = order.into_iter().map(|(_, key)| key.clone()).collect();
        for key in &victims {
            entries.remove(key);
        }

        victims.len()
    }
}
