//! Configuration Module
//!
//! Holds the construction-time parameters of a cache and loads them from
//! environment variables when asked to.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default number of shards (hash mask `0xFF`).
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Default interval between cleaner sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default per-shard entry threshold.
pub const DEFAULT_MAX_SLOT_SIZE: usize = 1024 * 1024;

/// Default fraction of `max_slot_size` kept after an eviction run.
pub const DEFAULT_REDUCE_SLOT_SIZE_RATE: f64 = 0.75;

/// Cache configuration parameters.
///
/// Immutable once handed to a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Number of shards, must be a power of two
    pub shard_count: usize,
    /// Period of the background cleaner, also the default entry lifetime
    pub cleanup_interval: Duration,
    /// Entry count above which a shard is trimmed, 0 disables eviction
    pub max_slot_size: usize,
    /// Fraction of `max_slot_size` a trimmed shard is reduced to
    pub reduce_slot_size_rate: f64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SLOT_CACHE_SHARDS` - Shard count (default: 256)
    /// - `SLOT_CACHE_CLEANUP_INTERVAL_SECS` - Cleanup frequency in seconds (default: 600)
    /// - `SLOT_CACHE_MAX_SLOT_SIZE` - Per-shard entry threshold (default: 1048576)
    /// - `SLOT_CACHE_REDUCE_RATE` - Eviction reduce rate (default: 0.75)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shard_count: env::var("SLOT_CACHE_SHARDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shard_count),
            cleanup_interval: env::var("SLOT_CACHE_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            max_slot_size: env::var("SLOT_CACHE_MAX_SLOT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_slot_size),
            reduce_slot_size_rate: env::var("SLOT_CACHE_REDUCE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reduce_slot_size_rate),
        }
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_max_slot_size(mut self, max_slot_size: usize) -> Self {
        self.max_slot_size = max_slot_size;
        self
    }

    pub fn with_reduce_slot_size_rate(mut self, rate: f64) -> Self {
        self.reduce_slot_size_rate = rate;
        self
    }

    // == Validate ==
    /// Checks that the configuration is internally consistent.
    ///
    /// The reduce rate is only checked when eviction is enabled
    /// (`max_slot_size > 0`).
    pub fn validate(&self) -> Result<()> {
        if !self.shard_count.is_power_of_two() {
            return Err(CacheError::InvalidShardCount(self.shard_count));
        }

        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidCleanupInterval);
        }

        let rate = self.reduce_slot_size_rate;
        if self.max_slot_size > 0 && !(rate > 0.0 && rate <= 1.0) {
            return Err(CacheError::InvalidReduceRate(rate));
        }

        Ok(())
    }

    /// Bit mask applied to router output.
    pub fn shard_mask(&self) -> usize {
        self.shard_count - 1
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_slot_size: DEFAULT_MAX_SLOT_SIZE,
            reduce_slot_size_rate: DEFAULT_REDUCE_SLOT_SIZE_RATE,
        }
    }
}
