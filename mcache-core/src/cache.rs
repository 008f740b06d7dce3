//! 2Q LRU cache for hot documents
//!
//! A 2Q cache splits entries across two queues: a probationary `recent`
//! queue admitting first-time keys, and a `frequent` queue holding keys that
//! were touched again. Keys evicted from `recent` leave a marker in a
//! `ghost` queue; a subsequent add of a ghosted key goes straight to
//! `frequent`. This keeps one-shot scans from flushing the hot set.
//!
//! The cache is internally synchronized (callers share it behind `Arc` or a
//! plain reference) and keeps hit/miss/eviction counters for inspection.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fraction of capacity reserved for the probationary queue
const RECENT_RATIO: f64 = 0.25;
/// Ghost queue size as a fraction of capacity
const GHOST_RATIO: f64 = 0.5;

/// Point-in-time counter snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from either live queue
    pub hits: u64,
    /// Lookups that missed both live queues
    pub misses: u64,
    /// Entries pushed out to make room
    pub evictions: u64,
    /// Current number of live entries
    pub len: usize,
}

struct Queues<K: Hash + Eq, V> {
    recent: LruCache<K, V>,
    frequent: LruCache<K, V>,
    ghost: LruCache<K, ()>,
}

/// Size-bounded 2Q cache
pub struct TwoQueueCache<K: Hash + Eq + Clone, V: Clone> {
    capacity: usize,
    recent_capacity: usize,
    queues: Mutex<Queues<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K: Hash + Eq + Clone, V: Clone> TwoQueueCache<K, V> {
    /// Create a cache holding at most `capacity` live entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let ghost_capacity = ((capacity as f64 * GHOST_RATIO) as usize).max(1);
        Self {
            capacity,
            recent_capacity: ((capacity as f64 * RECENT_RATIO) as usize).max(1),
            queues: Mutex::new(Queues {
                recent: LruCache::unbounded(),
                frequent: LruCache::unbounded(),
                ghost: LruCache::new(
                    NonZeroUsize::new(ghost_capacity).expect("ghost capacity is at least 1"),
                ),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a key, promoting probationary hits to the frequent queue
    pub fn get(&self, key: &K) -> Option<V> {
        let mut q = self.queues.lock();
        if let Some(v) = q.frequent.get(key) {
            let v = v.clone();
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(v);
        }
        if let Some(v) = q.recent.pop(key) {
            q.frequent.put(key.clone(), v.clone());
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(v);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Whether a key is live in the cache, without touching recency
    pub fn contains(&self, key: &K) -> bool {
        let q = self.queues.lock();
        q.frequent.contains(key) || q.recent.contains(key)
    }

    /// Insert or refresh a value
    pub fn add(&self, key: K, value: V) {
        let mut q = self.queues.lock();
        if q.frequent.contains(&key) {
            q.frequent.put(key, value);
            return;
        }
        if q.recent.contains(&key) {
            q.recent.pop(&key);
            q.frequent.put(key, value);
            return;
        }
        if q.ghost.pop(&key).is_some() {
            self.ensure_space(&mut q, true);
            q.frequent.put(key, value);
            return;
        }
        self.ensure_space(&mut q, false);
        q.recent.put(key, value);
    }

    /// Drop a key from every queue; returns whether a live entry was removed
    pub fn remove(&self, key: &K) -> bool {
        let mut q = self.queues.lock();
        let live = q.frequent.pop(key).is_some() | q.recent.pop(key).is_some();
        q.ghost.pop(key);
        live
    }

    /// All live keys, frequent queue first
    pub fn keys(&self) -> Vec<K> {
        let q = self.queues.lock();
        q.frequent
            .iter()
            .chain(q.recent.iter())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let q = self.queues.lock();
        q.frequent.len() + q.recent.len()
    }

    /// Whether the cache holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the hit/miss/eviction counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            len: self.len(),
        }
    }

    /// Evict one entry if the live queues are at capacity.
    ///
    /// Prefers the probationary queue once it exceeds its share; a key
    /// evicted from `recent` is remembered in `ghost`.
    fn ensure_space(&self, q: &mut Queues<K, V>, recent_evict: bool) {
        if q.recent.len() + q.frequent.len() < self.capacity {
            return;
        }
        let recent_len = q.recent.len();
        if recent_len > 0
            && (recent_len > self.recent_capacity
                || (recent_len == self.recent_capacity && !recent_evict))
        {
            if let Some((k, _)) = q.recent.pop_lru() {
                q.ghost.put(k, ());
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        } else if q.frequent.pop_lru().is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> std::fmt::Debug for TwoQueueCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = self.queues.lock();
        f.debug_struct("TwoQueueCache")
            .field("capacity", &self.capacity)
            .field("recent", &q.recent.len())
            .field("frequent", &q.frequent.len())
            .field("ghost", &q.ghost.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get() {
        let cache = TwoQueueCache::new(8);
        cache.add("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
    }

    #[test]
    fn second_touch_promotes_to_frequent() {
        let cache = TwoQueueCache::new(8);
        cache.add("a".to_string(), 1);
        // First get moves the key out of the probationary queue.
        cache.get(&"a".to_string());
        // Refreshing a frequent key keeps exactly one live entry.
        cache.add("a".to_string(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn capacity_is_respected() {
        let cache = TwoQueueCache::new(4);
        for i in 0..100 {
            cache.add(format!("k{i}"), i);
        }
        assert!(cache.len() <= 4);
        assert!(cache.stats().evictions >= 96);
    }

    #[test]
    fn ghosted_key_readmits_to_frequent() {
        // capacity 8 -> ghost holds 4 keys; one eviction wave keeps "a" ghosted.
        let cache = TwoQueueCache::new(8);
        cache.add("a".to_string(), 1);
        for i in 0..8 {
            cache.add(format!("k{i}"), i);
        }
        assert!(!cache.contains(&"a".to_string()));
        // Re-adding a ghosted key counts as a reuse signal.
        cache.add("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert!(cache.len() <= 8);
    }

    #[test]
    fn remove_drops_live_entry() {
        let cache = TwoQueueCache::new(4);
        cache.add("a".to_string(), 1);
        assert!(cache.remove(&"a".to_string()));
        assert!(!cache.remove(&"a".to_string()));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_spans_both_queues() {
        let cache = TwoQueueCache::new(8);
        cache.add("a".to_string(), 1);
        cache.add("b".to_string(), 2);
        cache.get(&"a".to_string()); // promote "a" to frequent
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
