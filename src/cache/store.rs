//! Cache Store Module
//!
//! Main cache engine combining concurrent map storage with LRU tracking and TTL expiration.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, RecencyIndex};
use crate::cache::stats::StatsRecorder;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_expiry_timer, spawn_sweep_task};

// == Cache Core ==
/// State shared between callers and the background tasks.
///
/// `recency` is the serialized section: every mutation that must keep the
/// table and the recency index in step holds it. Plain value reads only
/// touch the table. Lock order is always `recency` first, then a table shard.
pub(crate) struct CacheCore<K, V> {
    table: DashMap<K, CacheEntry<V>>,
    recency: Mutex<RecencyIndex<K>>,
    stats: StatsRecorder,
    generations: AtomicU64,
    ttl: Duration,
    max_size: usize,
}

impl<K, V> CacheCore<K, V>
where
    K: Clone + Eq + Hash,
{
    pub(crate) fn new(config: &CacheConfig) -> Self {
        Self {
            table: DashMap::new(),
            recency: Mutex::new(RecencyIndex::new()),
            stats: StatsRecorder::default(),
            generations: AtomicU64::new(0),
            ttl: config.ttl,
            max_size: config.max_size,
        }
    }

    /// Stores a fresh entry, evicting the LRU key when a new key would
    /// exceed capacity. Returns the generation of the stored entry.
    pub(crate) fn insert(&self, key: K, value: V) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(value, generation);

        let mut recency = self.recency.lock();
        if self.table.contains_key(&key) {
            recency.remove(&key);
        } else if self.table.len() >= self.max_size {
            if let Some(oldest) = recency.pop_oldest() {
                if self.table.remove(&oldest).is_some() {
                    self.stats.record_eviction();
                    debug!("LRU eviction at capacity {}", self.max_size);
                }
            }
        }
        recency.touch(key.clone());
        self.table.insert(key, entry);

        generation
    }

    fn lookup<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let now = Instant::now();
        let value = {
            let Some(mut entry) = self.table.get_mut(key) else {
                self.stats.record_miss();
                return None;
            };
            if entry.is_expired_at(now, self.ttl) {
                None
            } else {
                entry.touch(now);
                Some(entry.value.clone())
            }
        };

        match value {
            Some(value) => {
                self.recency.lock().refresh(key);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.remove_if_expired(key, now);
                self.stats.record_miss();
                None
            }
        }
    }

    pub(crate) fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut recency = self.recency.lock();
        recency.remove(key);
        self.table.remove(key).is_some()
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(key)
    }

    /// Removes `key` only if the resident entry is the one a timer was
    /// scheduled for.
    pub(crate) fn expire<Q>(&self, key: &Q, generation: u64) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut recency = self.recency.lock();
        let removed = self
            .table
            .remove_if(key, |_, entry| entry.generation == generation)
            .is_some();
        if removed {
            recency.remove(key);
            self.stats.record_expiration();
        }
        removed
    }

    /// Re-checks the age under the section so a key re-inserted after a
    /// sweep scan is left alone.
    fn remove_if_expired<Q>(&self, key: &Q, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut recency = self.recency.lock();
        let removed = self
            .table
            .remove_if(key, |_, entry| entry.is_expired_at(now, self.ttl))
            .is_some();
        if removed {
            recency.remove(key);
            self.stats.record_expiration();
        }
        removed
    }

    /// One full-table pass. Each removal takes the section on its own.
    pub(crate) fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .table
            .iter()
            .filter(|item| item.value().is_expired_at(now, self.ttl))
            .map(|item| item.key().clone())
            .collect();

        expired
            .iter()
            .filter(|key| self.remove_if_expired(*key, now))
            .count()
    }

    fn attach_timer(&self, key: &K, generation: u64, timer: AbortHandle) {
        if let Some(mut entry) = self.table.get_mut(key) {
            if entry.generation == generation {
                entry.expiry = Some(timer);
                return;
            }
        }
        // Entry already replaced or gone
        timer.abort();
    }
}

// == Bounded Expiring Cache ==
/// Thread-safe key/value cache bounded by size (LRU) and age (TTL).
///
/// Expiry runs on a tokio runtime: a periodic sweep every `ttl / 2` plus,
/// unless disabled, a one-shot timer per stored entry. All public
/// operations are synchronous and may be called from any thread.
///
/// Share the cache between threads with an [`Arc`]; every operation takes
/// `&self`. Values are cloned out on `get`, so wrap expensive values in an
/// `Arc`.
pub struct BoundedExpiringCache<K, V> {
    core: Arc<CacheCore<K, V>>,
    runtime: Handle,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    expiry_timers: bool,
}

impl<K, V> BoundedExpiringCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache whose background tasks run on the current tokio runtime.
    ///
    /// # Errors
    /// - `CacheError::InvalidConfig` for a zero ttl or zero max_size
    /// - `CacheError::NoRuntime` when called outside a tokio runtime
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        Ok(Self::start(config, runtime))
    }

    /// Creates a cache whose background tasks run on `runtime`.
    pub fn with_handle(config: CacheConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;
        Ok(Self::start(config, runtime))
    }

    /// Builds the cache from an already validated config.
    fn start(config: CacheConfig, runtime: Handle) -> Self {
        let core = Arc::new(CacheCore::new(&config));
        let shutdown = CancellationToken::new();
        let sweeper = spawn_sweep_task(
            &runtime,
            Arc::downgrade(&core),
            config.sweep_interval(),
            shutdown.clone(),
        );

        Self {
            core,
            runtime,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
            expiry_timers: config.expiry_timers,
        }
    }

    // == Put ==
    /// Stores a key-value pair, restarting the key's TTL.
    ///
    /// When the cache is full and `key` is new, the least recently used key
    /// is evicted first, so a put may drop an unrelated key.
    pub fn put(&self, key: K, value: V) {
        let timer_key = self.expiry_timers.then(|| key.clone());
        let generation = self.core.insert(key, value);

        if let Some(key) = timer_key {
            let timer = spawn_expiry_timer(
                &self.runtime,
                Arc::downgrade(&self.core),
                key.clone(),
                generation,
                self.core.ttl,
            );
            self.core.attach_timer(&key, generation, timer);
        }
    }

    // == Get ==
    /// Retrieves a clone of the value and marks the key most recently used.
    ///
    /// An entry older than the TTL counts as a miss and is removed.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.lookup(key)
    }

    // == Remove ==
    /// Removes an entry. Removing an absent key is a no-op.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.remove(key);
    }

    /// Checks residency without affecting recency or statistics.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.contains_key(key)
    }

    // == Cleanup Expired ==
    /// Runs one sweep pass immediately.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.core.sweep_expired()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut recency = self.core.recency.lock();
        self.core.table.clear();
        recency.clear();
    }

    // == Size ==
    /// Returns the current number of resident keys.
    ///
    /// Counted under the serialized section so a concurrent evict-then-insert
    /// is never seen half done.
    pub fn size(&self) -> usize {
        self.core.recency.lock().len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Resident keys in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.core.table.iter().map(|item| item.key().clone()).collect()
    }

    /// Keys ordered from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.core.recency.lock().iter().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.core.stats.snapshot(self.size())
    }

    pub fn ttl(&self) -> Duration {
        self.core.ttl
    }

    pub fn max_size(&self) -> usize {
        self.core.max_size
    }
}

impl<K, V> BoundedExpiringCache<K, V> {
    // == Shutdown ==
    /// Cancels the periodic sweep.
    ///
    /// One-shot timers already scheduled still fire; removing an absent key
    /// is harmless. Later `put` calls keep arming their own timers, so
    /// entries still expire while the runtime is alive. Calling this more
    /// than once has no further effect.
    pub fn shutdown(&self) {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return;
        };
        self.shutdown.cancel();
        drop(sweeper);
        info!("Cache shut down, TTL sweep cancelled");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<K, V> Drop for BoundedExpiringCache<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<K, V> fmt::Debug for BoundedExpiringCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedExpiringCache")
            .field("ttl", &self.core.ttl)
            .field("max_size", &self.core.max_size)
            .field("expiry_timers", &self.expiry_timers)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
