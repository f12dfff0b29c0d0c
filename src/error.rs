//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Only construction can
//! fail; lookups report misses through `Option` instead.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Shard count is zero or not a power of two
    #[error("Invalid shard count: {0} (must be a non-zero power of two)")]
    InvalidShardCount(usize),

    /// Cleanup interval is zero
    #[error("Invalid cleanup interval: must be greater than zero")]
    InvalidCleanupInterval,

    /// Reduce rate outside (0, 1] while eviction is enabled
    #[error("Invalid reduce slot size rate: {0} (must be in (0, 1])")]
    InvalidReduceRate(f64),

    /// No tokio runtime available to host the cleaner task
    #[error("No tokio runtime available to start the cleaner task")]
    MissingRuntime,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
