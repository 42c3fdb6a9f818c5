//! Bounded LRU memoizing compiled schema artifacts
//!
//! Entries live in a slab of nodes linked by index (most recently used at
//! the head, least recently used at the tail) plus a hash index from key to
//! slot, giving O(1) promotion and eviction. TTL is checked lazily on access.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

/// Structural hash of a schema plus the options it was compiled with.
///
/// Equal schemas hash equally regardless of where they came from; any change
/// to the schema or options produces a new key and the old entry simply ages
/// out.
pub fn structural_hash<S: Serialize + ?Sized>(schema: &S, options: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    match serde_json::to_string(schema) {
        Ok(canonical) => canonical.hash(&mut hasher),
        Err(e) => e.to_string().hash(&mut hasher),
    }
    options.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug)]
struct Slot<V> {
    key: u64,
    value: V,
    inserted_at: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct LruInner<V> {
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    index: HashMap<u64, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> LruInner<V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn slot(&self, idx: usize) -> Option<&Slot<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Slot<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slot(idx) {
            Some(slot) => (slot.prev, slot.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(slot) = self.slot_mut(p) {
                    slot.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(slot) = self.slot_mut(n) {
                    slot.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(slot) = self.slot_mut(idx) {
            slot.prev = None;
            slot.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slot_mut(idx) {
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(slot) = self.slot_mut(h) {
                slot.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn remove_slot(&mut self, idx: usize) -> Option<Slot<V>> {
        self.detach(idx);
        let slot = self.slots.get_mut(idx).and_then(Option::take)?;
        self.index.remove(&slot.key);
        self.free.push(idx);
        Some(slot)
    }

    fn allocate(&mut self, slot: Slot<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe LRU keyed by [`structural_hash`]
#[derive(Debug)]
pub struct SchemaCache<V> {
    inner: Mutex<LruInner<V>>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl<V: Clone> SchemaCache<V> {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruInner::new()),
            capacity: capacity.max(1),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let cache = Self::new(config.capacity);
        match config.ttl {
            Some(ttl) => cache.with_ttl(ttl),
            None => cache,
        }
    }

    fn is_expired(&self, slot: &Slot<V>) -> bool {
        self.ttl.map_or(false, |ttl| slot.inserted_at.elapsed() >= ttl)
    }

    /// Fetch and promote to most recently used
    pub fn get(&self, key: u64) -> Option<V> {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(&key) else {
            inner.misses += 1;
            return None;
        };

        if inner.slot(idx).map_or(true, |slot| self.is_expired(slot)) {
            inner.remove_slot(idx);
            inner.misses += 1;
            return None;
        }

        inner.detach(idx);
        inner.push_front(idx);
        inner.hits += 1;
        inner.slot(idx).map(|slot| slot.value.clone())
    }

    /// Insert or replace, evicting the least recently used entry on overflow
    pub fn set(&self, key: u64, value: V) {
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(&key) {
            if let Some(slot) = inner.slot_mut(idx) {
                slot.value = value;
                slot.inserted_at = Instant::now();
            }
            inner.detach(idx);
            inner.push_front(idx);
            return;
        }

        while inner.index.len() >= self.capacity {
            match inner.tail {
                Some(tail) => {
                    inner.remove_slot(tail);
                    inner.evictions += 1;
                }
                None => break,
            }
        }

        let idx = inner.allocate(Slot {
            key,
            value,
            inserted_at: Instant::now(),
            prev: None,
            next: None,
        });
        inner.index.insert(key, idx);
        inner.push_front(idx);
    }

    /// Presence check that does not affect recency; expired entries are dropped
    pub fn has(&self, key: u64) -> bool {
        let mut inner = self.inner.lock();
        let Some(&idx) = inner.index.get(&key) else {
            return false;
        };
        if inner.slot(idx).map_or(true, |slot| self.is_expired(slot)) {
            inner.remove_slot(idx);
            return false;
        }
        true
    }

    pub fn delete(&self, key: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.index.get(&key).copied() {
            Some(idx) => inner.remove_slot(idx).is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let (hits, misses, evictions) = (inner.hits, inner.misses, inner.evictions);
        *inner = LruInner::new();
        inner.hits = hits;
        inner.misses = misses;
        inner.evictions = evictions;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<u64> {
        let inner = self.inner.lock();
        let mut keys = Vec::with_capacity(inner.index.len());
        let mut cursor = inner.head;
        while let Some(idx) = cursor {
            match inner.slot(idx) {
                Some(slot) => {
                    keys.push(slot.key);
                    cursor = slot.next;
                }
                None => break,
            }
        }
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.index.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }

    /// Return the cached value or build, store and return it. The lock is
    /// not held while `build` runs, so concurrent misses may build twice.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: u64,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = build()?;
        self.set(key, value.clone());
        Ok(value)
    }
}

impl<V: Clone> Default for SchemaCache<V> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
