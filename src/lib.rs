//! Mini Cache - A bounded in-process cache
//!
//! Provides a thread-safe key/value cache with LRU eviction and TTL expiration,
//! expired in the background by a periodic sweep and per-entry timers.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{BoundedExpiringCache, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
