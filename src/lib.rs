//! Slot Cache - A sharded in-memory cache
//!
//! Keys are routed to a fixed set of independently locked shards. Entries
//! expire after a configured interval and are swept by a background task;
//! a shard that grows past its threshold is trimmed by recency.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    CacheStats, CustomHash, EvictionPolicy, HashRouter, IntMask, ShardedCache, StringHash,
    WideIntMask,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
