//! Cache Module
//!
//! Provides a sharded in-memory cache with TTL expiration and per-shard
//! recency eviction.

mod entry;
mod evictor;
mod hash;
mod shard;
mod stats;
mod store;


// Re-export public types
pub use entry::{deadline_after, RecencyClock, ValueItem, FAR_FUTURE};
pub use evictor::EvictionPolicy;
pub use hash::{byte_sum, CustomHash, HashRouter, IntMask, StringHash, WideIntMask};
pub use shard::{Lookup, Shard};
pub use stats::{CacheStats, StatsCounters};
pub use store::ShardedCache;
