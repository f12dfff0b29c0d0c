//! Shard Module
//!
//! One independently locked partition of the cache. Reads take the shared
//! lock, every mutation takes the exclusive lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;
use tokio::time::Instant;

use crate::cache::{EvictionPolicy, RecencyClock, ValueItem};

// == Lookup ==
/// Outcome of a shard read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    /// Key was past its deadline and this lookup removed it
    Expired,
    Miss,
}

impl<V> Lookup<V> {
    pub fn into_option(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired | Lookup::Miss => None,
        }
    }
}

// == Shard ==
/// Locked mapping from key to item. The entry count is the map's length.
#[derive(Debug)]
pub struct Shard<K, V> {
    entries: RwLock<HashMap<K, ValueItem<V>>>,
}

impl<K, V> Shard<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    // == Get ==
    /// Looks up `key` as of `now`.
    ///
    /// A live entry has its recency marker bumped under the shared lock. An
    /// expired entry is a miss and is removed on the way out, after re-checking
    /// its deadline under the exclusive lock. If a sweep or a writer got there
    /// first the lookup is a plain `Miss`, so each removal is reported once.
    pub fn get<Q>(&self, key: &Q, now: Instant, clock: &RecencyClock) -> Lookup<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        match self.entries.read().get(key) {
            None => return Lookup::Miss,
            Some(item) if !item.is_expired_at(now) => {
                item.touch(clock.tick());
                return Lookup::Hit(item.value().clone());
            }
            Some(_) => {}
        }

        let mut guard = self.entries.write();
        if guard.get(key).is_some_and(|item| item.is_expired_at(now)) {
            guard.remove(key);
            Lookup::Expired
        } else {
            Lookup::Miss
        }
    }

    // == Contains ==
    /// True if `key` holds a live entry. Does not touch recency.
    pub fn contains_key<Q>(&self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .read()
            .get(key)
            .is_some_and(|item| !item.is_expired_at(now))
    }

    // == Put ==
    /// Inserts or replaces the item for `key`, then trims the shard if it grew
    /// past the policy threshold. Eviction runs before the lock is released.
    ///
    /// Returns the number of evicted entries.
    pub fn put(&self, key: K, item: ValueItem<V>, policy: &EvictionPolicy) -> usize
    where
        K: Ord + Clone,
    {
        let mut guard = self.entries.write();
        guard.insert(key, item);

        if policy.should_evict(guard.len()) {
            policy.evict(&mut *guard)
        } else {
            0
        }
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.write().remove(key).is_some()
    }

    // == Sweep Expired ==
    /// Removes every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut guard = self.entries.write();
        let before = guard.len();
        guard.retain(|_, item| !item.is_expired_at(now));
        before - guard.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry. Returns how many were held.
    pub fn clear(&self) -> usize {
        let mut guard = self.entries.write();
        let count = guard.len();
        guard.clear();
        count
    }
}

impl<K: Hash + Eq, V> Default for Shard<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    fn put(
        shard: &Shard<String, String>,
        clock: &RecencyClock,
        policy: &EvictionPolicy,
        key: &str,
        value: &str,
    ) -> usize {
        let item = ValueItem::with_ttl(value.to_string(), Instant::now(), TTL, clock.tick());
        shard.put(key.to_string(), item, policy)
    }

    #[test]
    fn test_shard_set_and_get() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "key1", "value1");

        assert_eq!(
            shard.get("key1", Instant::now(), &clock),
            Lookup::Hit("value1".to_string())
        );
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_get_nonexistent() {
        let shard: Shard<String, String> = Shard::new();
        let clock = RecencyClock::new();

        assert_eq!(shard.get("missing", Instant::now(), &clock), Lookup::Miss);
    }

    #[test]
    fn test_shard_overwrite() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "key1", "value1");
        put(&shard, &clock, &policy, "key1", "value2");

        assert_eq!(
            shard.get("key1", Instant::now(), &clock).into_option(),
            Some("value2".to_string())
        );
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_expired_get_removes_entry() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "key1", "value1");

        let later = Instant::now() + TTL;
        assert_eq!(shard.get("key1", later, &clock), Lookup::Expired);
        assert!(shard.is_empty());
        assert_eq!(shard.get("key1", later, &clock), Lookup::Miss);
    }

    #[test]
    fn test_shard_get_after_sweep_is_plain_miss() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "key1", "value1");

        // The sweep owns the removal, the read must not report it again
        let later = Instant::now() + TTL;
        assert_eq!(shard.sweep_expired(later), 1);
        assert_eq!(shard.get("key1", later, &clock), Lookup::Miss);
    }

    #[test]
    fn test_shard_get_bumps_recency() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::new(2, 1.0);

        put(&shard, &clock, &policy, "a", "1");
        put(&shard, &clock, &policy, "b", "2");
        shard.get("a", Instant::now(), &clock);

        // "b" is now the least recently touched
        assert_eq!(put(&shard, &clock, &policy, "c", "3"), 1);
        assert!(shard.contains_key("a", Instant::now()));
        assert!(!shard.contains_key("b", Instant::now()));
        assert!(shard.contains_key("c", Instant::now()));
    }

    #[test]
    fn test_shard_delete_is_idempotent() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "key1", "value1");

        assert!(shard.delete("key1"));
        assert!(!shard.delete("key1"));
        assert_eq!(shard.get("key1", Instant::now(), &clock), Lookup::Miss);
    }

    #[test]
    fn test_shard_sweep_expired() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();
        let now = Instant::now();

        shard.put(
            "short".to_string(),
            ValueItem::with_ttl("v".to_string(), now, Duration::from_secs(1), clock.tick()),
            &policy,
        );
        shard.put(
            "long".to_string(),
            ValueItem::with_ttl("v".to_string(), now, Duration::from_secs(10), clock.tick()),
            &policy,
        );

        assert_eq!(shard.sweep_expired(now), 0);
        // Deadline exactly reached counts as expired
        assert_eq!(shard.sweep_expired(now + Duration::from_secs(1)), 1);
        assert_eq!(shard.len(), 1);
        assert!(shard.contains_key("long", now));
    }

    #[test]
    fn test_shard_eviction_on_put() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::new(2, 0.5);

        assert_eq!(put(&shard, &clock, &policy, "A", "1"), 0);
        assert_eq!(put(&shard, &clock, &policy, "B", "2"), 0);
        assert_eq!(put(&shard, &clock, &policy, "C", "3"), 2);

        assert_eq!(shard.len(), 1);
        assert!(shard.contains_key("C", Instant::now()));
    }

    #[test]
    fn test_shard_clear() {
        let shard = Shard::new();
        let clock = RecencyClock::new();
        let policy = EvictionPolicy::disabled();

        put(&shard, &clock, &policy, "a", "1");
        put(&shard, &clock, &policy, "b", "2");

        assert_eq!(shard.clear(), 2);
        assert!(shard.is_empty());
    }
}
