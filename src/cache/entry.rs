//! Value Item Module
//!
//! Defines the stored unit: a cached value plus its expiry deadline and
//! recency marker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Lifetime used when a requested deadline does not fit in an `Instant`.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// == Deadline ==
/// `now + ttl`, saturating to `now + FAR_FUTURE` when the sum overflows.
pub fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

// == Value Item ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug)]
pub struct ValueItem<V> {
    /// The stored value
    value: V,
    /// Absolute expiry deadline, fixed at insertion
    expires_at: Instant,
    /// Recency marker, bumped on every successful read
    recency: AtomicU64,
}

impl<V> ValueItem<V> {
    // == Constructor ==
    /// Creates a new item.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expires_at` - Absolute deadline after which the item is a miss
    /// * `recency` - Initial recency marker
    pub fn new(value: V, expires_at: Instant, recency: u64) -> Self {
        Self {
            value,
            expires_at,
            recency: AtomicU64::new(recency),
        }
    }

    /// Creates an item living `ttl` past `now`. An unrepresentable deadline
    /// is capped at `FAR_FUTURE`.
    pub fn with_ttl(value: V, now: Instant, ttl: Duration, recency: u64) -> Self {
        Self::new(value, deadline_after(now, ttl), recency)
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks if the item has expired as of `now`.
    ///
    /// Boundary condition: the item is expired when `now >= expires_at`, so an
    /// item is gone as soon as its lifetime has fully elapsed.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    pub fn recency(&self) -> u64 {
        self.recency.load(Ordering::Relaxed)
    }

    // == Touch ==
    /// Records an access. Only needs shared access to the item, so readers
    /// holding a shard's read lock can call it.
    pub fn touch(&self, recency: u64) {
        self.recency.fetch_max(recency, Ordering::Relaxed);
    }
}

// == Recency Clock ==
/// Monotonic source of recency markers shared by every shard of a cache.
#[derive(Debug, Default)]
pub struct RecencyClock {
    counter: AtomicU64,
}

impl RecencyClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next marker. Markers are unique and strictly increasing.
    pub fn tick(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
