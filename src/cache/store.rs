//! Cache Store Module
//!
//! Main cache engine: a fixed set of shards selected by a hash router, with
//! per-shard recency eviction and a background TTL sweep.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, EvictionPolicy, HashRouter, Lookup, RecencyClock, Shard, StatsCounters,
    ValueItem,
};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{Cleaner, Sweep};

// == Shard Set ==
/// State shared between the cache facade and its cleaner task.
#[derive(Debug)]
struct ShardSet<K, V> {
    shards: Box<[Shard<K, V>]>,
    clock: RecencyClock,
    stats: StatsCounters,
}

impl<K, V> ShardSet<K, V>
where
    K: Hash + Eq,
{
    fn new(shard_count: usize) -> Self {
        Self {
            shards: (0..shard_count).map(|_| Shard::new()).collect(),
            clock: RecencyClock::new(),
            stats: StatsCounters::new(),
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }
}

impl<K, V> Sweep for ShardSet<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn sweep_expired(&self, now: Instant) -> usize {
        let removed = self
            .shards
            .iter()
            .map(|shard| shard.sweep_expired(now))
            .sum();
        self.stats.record_expirations(removed);
        removed
    }
}

// == Sharded Cache ==
/// Concurrent key-value cache partitioned into independently locked shards.
///
/// Every entry lives for `cleanup_interval` unless inserted with an explicit
/// TTL. A shard holding more than `max_slot_size` entries is trimmed back to
/// `floor(max_slot_size * reduce_slot_size_rate)` entries, least recently
/// touched first. Reads and writes both count as touches.
///
/// `close()` only stops the background sweep: the cache stays fully usable and
/// expired entries keep being reported as misses, they are just no longer
/// removed in bulk.
#[derive(Debug)]
pub struct ShardedCache<K, V, R> {
    inner: Arc<ShardSet<K, V>>,
    router: R,
    shard_mask: usize,
    ttl: Duration,
    policy: EvictionPolicy,
    cleaner: Cleaner,
}

impl<K, V, R> ShardedCache<K, V, R>
where
    K: Hash + Eq + Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: HashRouter<K>,
{
    // == Constructor ==
    /// Creates a cache and starts its cleaner on the current tokio runtime.
    ///
    /// # Arguments
    /// * `config` - Shard count, cleanup interval and eviction thresholds
    /// * `router` - Strategy mapping keys to shards
    ///
    /// # Errors
    /// Any configuration error from [`CacheConfig::validate`], or
    /// `MissingRuntime` when there is no tokio runtime to host the cleaner.
    pub fn new(config: CacheConfig, router: R) -> Result<Self> {
        if let Err(err) = config.validate() {
            warn!("Rejected cache configuration: {}", err);
            return Err(err);
        }

        let inner = Arc::new(ShardSet::new(config.shard_count));
        let cleaner = Cleaner::spawn(inner.clone(), config.cleanup_interval)?;

        let policy = EvictionPolicy::new(config.max_slot_size, config.reduce_slot_size_rate);
        info!(
            "Cache created: shards={}, cleanup_interval={:?}, max_slot_size={}, reduce_rate={}",
            config.shard_count,
            config.cleanup_interval,
            config.max_slot_size,
            config.reduce_slot_size_rate
        );
        if !policy.is_enabled() {
            info!("Eviction disabled (max_slot_size = 0)");
        }

        Ok(Self {
            inner,
            router,
            shard_mask: config.shard_mask(),
            ttl: config.cleanup_interval,
            policy,
            cleaner,
        })
    }

    // == Shard For ==
    /// Index of the shard `key` routes to. Router output is masked here so a
    /// router that ignores `shard_mask` still lands in range.
    pub fn shard_for<Q>(&self, key: &Q) -> usize
    where
        R: HashRouter<Q>,
        Q: ?Sized,
    {
        self.router.shard_index(key, self.shard_mask) & self.shard_mask
    }

    fn shard<Q>(&self, key: &Q) -> &Shard<K, V>
    where
        R: HashRouter<Q>,
        Q: ?Sized,
    {
        &self.inner.shards[self.shard_for(key)]
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `None` if the key is absent or expired. A hit counts as a touch
    /// for eviction ordering. Expired entries are removed on the way out.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: HashRouter<Q>,
    {
        let lookup = self.shard(key).get(key, Instant::now(), &self.inner.clock);
        match lookup {
            Lookup::Hit(_) => self.inner.stats.record_hit(),
            Lookup::Expired => {
                self.inner.stats.record_miss();
                self.inner.stats.record_expirations(1);
            }
            Lookup::Miss => self.inner.stats.record_miss(),
        }
        lookup.into_option()
    }

    /// True if `key` holds a live entry. Does not count as a touch.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: HashRouter<Q>,
    {
        self.shard(key).contains_key(key, Instant::now())
    }

    // == Put ==
    /// Stores a key-value pair living for the cleanup interval.
    ///
    /// An existing entry is replaced outright. May trim the target shard.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.ttl);
    }

    /// Stores a key-value pair living for `ttl`.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let index = self.shard_for(&key);
        let item = ValueItem::with_ttl(value, Instant::now(), ttl, self.inner.clock.tick());

        let evicted = self.inner.shards[index].put(key, item, &self.policy);
        if evicted > 0 {
            self.inner.stats.record_evictions(evicted);
            debug!(
                "Shard {} over {} entries: evicted {}, target {}",
                index,
                self.policy.max_slot_size,
                evicted,
                self.policy.target_len()
            );
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether it was present; deleting an
    /// absent key is not an error.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: HashRouter<Q>,
    {
        self.shard(key).delete(key)
    }

    // == Purge Expired ==
    /// Runs one sweep pass now, the same pass the cleaner runs on its timer.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Runs one sweep pass against `now`.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        self.inner.sweep_expired(now)
    }

    /// Drops every entry in every shard.
    pub fn clear(&self) {
        let removed: usize = self.inner.shards.iter().map(Shard::clear).sum();
        debug!("Cleared {} entries", removed);
    }

    // == Close ==
    /// Stops the background cleaner. The cache remains usable.
    pub fn close(&self) {
        if !self.cleaner.is_stopped() {
            info!("Closing cache, stopping cleaner");
        }
        self.cleaner.stop();
    }

    /// Stops the cleaner and waits for its task to exit.
    pub async fn shutdown(&self) {
        self.close();
        self.cleaner.join().await;
    }

    pub fn is_closed(&self) -> bool {
        self.cleaner.is_stopped()
    }
}

impl<K, V, R> ShardedCache<K, V, R>
where
    K: Hash + Eq,
{
    // == Length ==
    /// Returns the number of stored entries, including expired entries not
    /// yet swept.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.shards.iter().all(Shard::is_empty)
    }

    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    /// Entry count of shard `index`, or `None` if out of range.
    pub fn shard_len(&self, index: usize) -> Option<usize> {
        self.inner.shards.get(index).map(Shard::len)
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.len())
    }
}
