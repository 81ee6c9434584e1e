//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

// == Cache Entry ==
/// A stored value with its creation and last-access timestamps.
///
/// Timestamps use the tokio clock so a paused test runtime controls ageing.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Set once at construction
    pub created_at: Instant,
    /// Updated on every successful read
    #[allow(dead_code)]
    pub last_accessed_at: Instant,
    /// Identifies this entry among all entries ever stored under its key
    pub(crate) generation: u64,
    /// One-shot removal timer, aborted when the entry is discarded
    pub(crate) expiry: Option<AbortHandle>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub(crate) fn new(value: V, generation: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            generation,
            expiry: None,
        }
    }

    // == Age ==
    /// Time elapsed between creation and `now`.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    // == Is Expired ==
    /// An entry is expired once its age strictly exceeds `ttl`.
    pub fn is_expired_at(&self, now: Instant, ttl: Duration) -> bool {
        self.age_at(now) > ttl
    }

    /// Marks the entry as read at `now`.
    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_accessed_at = now;
    }
}

impl<V> Drop for CacheEntry<V> {
    fn drop(&mut self) {
        if let Some(timer) = self.expiry.take() {
            timer.abort();
        }
    }
}
