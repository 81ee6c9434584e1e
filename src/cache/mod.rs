//! Cache Module
//!
//! Provides in-process caching with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use stats::CacheStats;
pub use store::BoundedExpiringCache;

pub(crate) use entry::CacheEntry;
pub(crate) use lru::RecencyIndex;
pub(crate) use store::CacheCore;
