//! Process-scoped classifier cache.
//!
//! Classifiers store per-entity derived features here (string-constant sets,
//! opcode profiles) during parallel scoring phases. The arbiter clears the
//! cache on every match/unmatch mutation, during the serial commit phase, so
//! reads never race a clear.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::entity::Side;

/// Opaque cache key, hashed up front so the map stores plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Key for a per-entity feature.
    #[must_use]
    pub fn entity(feature: &str, side: Side, index: u32) -> Self {
        use xxhash_rust::xxh3::xxh3_64;

        let combined = format!("{feature}|{side}|{index}");
        Self(xxh3_64(combined.as_bytes()))
    }
}

type CacheValue = Arc<dyn Any + Send + Sync>;

/// Concurrent feature cache with hit statistics.
#[derive(Default)]
pub struct ClassifierCache {
    entries: RwLock<HashMap<CacheKey, CacheValue>>,
    lookups: AtomicUsize,
    hits: AtomicUsize,
}

impl std::fmt::Debug for ClassifierCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ClassifierCache")
            .field("size", &stats.size)
            .field("lookups", &stats.lookups)
            .field("hits", &stats.hits)
            .finish()
    }
}

impl ClassifierCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached value for `key`, computing and inserting it on a
    /// miss. Concurrent misses may compute twice; the first insert wins.
    pub fn get_or_insert_with<T, F>(&self, key: CacheKey, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if let Ok(entries) = self.entries.read() {
            if let Some(value) = entries.get(&key) {
                if let Ok(typed) = Arc::clone(value).downcast::<T>() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return typed;
                }
            }
        }

        let computed = Arc::new(compute());
        if let Ok(mut entries) = self.entries.write() {
            let stored = entries
                .entry(key)
                .or_insert_with(|| Arc::clone(&computed) as CacheValue);
            if let Ok(typed) = Arc::clone(stored).downcast::<T>() {
                return typed;
            }
        }
        computed
    }

    /// Drop every entry. Called by the arbiter after each mutation.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Snapshot of cache effectiveness counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let lookups = self.lookups.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let size = self.entries.read().map(|e| e.len()).unwrap_or(0);
        CacheStats {
            lookups,
            hits,
            misses: lookups.saturating_sub(hits),
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
            size,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub lookups: usize,
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_computes_once() {
        let cache = ClassifierCache::new();
        let key = CacheKey::entity("strings", Side::A, 3);

        let first = cache.get_or_insert_with(key, || vec![1u32, 2, 3]);
        let second = cache.get_or_insert_with(key, || vec![9u32]);
        assert_eq!(*first, vec![1, 2, 3]);
        assert_eq!(*second, vec![1, 2, 3], "Second lookup must hit the cache");

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_clear_empties_cache() {
        let cache = ClassifierCache::new();
        let key = CacheKey::entity("opcodes", Side::B, 0);
        let _ = cache.get_or_insert_with(key, || 42u32);
        cache.clear();
        assert_eq!(cache.stats().size, 0);

        let value = cache.get_or_insert_with(key, || 7u32);
        assert_eq!(*value, 7);
    }

    #[test]
    fn test_distinct_keys_per_side() {
        let a = CacheKey::entity("f", Side::A, 1);
        let b = CacheKey::entity("f", Side::B, 1);
        assert_ne!(a, b);
    }
}
