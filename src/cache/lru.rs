//! Recency Index Module
//!
//! Implements Least Recently Used ordering for cache eviction.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == Recency Index ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with the next value of a logical clock.
/// `by_tick` orders keys oldest-first, `ticks` finds a key's current stamp,
/// so moving a key to the tail never scans the whole sequence.
#[derive(Debug)]
pub struct RecencyIndex<K> {
    by_tick: BTreeMap<u64, K>,
    ticks: HashMap<K, u64>,
    clock: u64,
}

impl<K> Default for RecencyIndex<K> {
    fn default() -> Self {
        Self {
            by_tick: BTreeMap::new(),
            ticks: HashMap::new(),
            clock: 0,
        }
    }
}

impl<K> RecencyIndex<K>
where
    K: Clone + Eq + Hash,
{
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if absent.
    pub fn touch(&mut self, key: K) {
        self.clock += 1;
        if let Some(previous) = self.ticks.insert(key.clone(), self.clock) {
            self.by_tick.remove(&previous);
        }
        self.by_tick.insert(self.clock, key);
    }

    // == Refresh ==
    /// Moves an already tracked key to the tail.
    ///
    /// Returns false without inserting anything if the key is not tracked,
    /// which happens when a reader races a concurrent removal.
    pub fn refresh<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let Some(tick) = self.ticks.get_mut(key) else {
            return false;
        };
        self.clock += 1;
        let previous = std::mem::replace(tick, self.clock);
        if let Some(owned) = self.by_tick.remove(&previous) {
            self.by_tick.insert(self.clock, owned);
        }
        true
    }

    // == Remove ==
    /// Removes a key from the index. Returns whether it was tracked.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.ticks.remove(key) {
            Some(tick) => {
                self.by_tick.remove(&tick);
                true
            }
            None => false,
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let (_, key) = self.by_tick.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    #[allow(dead_code)]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.ticks.contains_key(key)
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.by_tick.values()
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_tick.clear();
        self.ticks.clear();
    }
}
