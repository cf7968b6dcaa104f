//! In-memory cache for catalog search results.
//!
//! Bounded by entry count and by age. Values are handed out as `Arc`s, so a
//! hit returns the very object stored by the first lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Size- and time-bounded search cache, safe to share between workers
pub struct SearchCache<V> {
    state: Mutex<CacheState<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<V> SearchCache<V> {
    /// Create a cache holding at most `capacity` entries for `ttl` each
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(capacity.min(1024)),
                hits: 0,
                misses: 0,
            }),
            capacity,
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let mut state = self.lock();

        let lookup = state
            .entries
            .get(key)
            .map(|entry| (entry.inserted_at.elapsed() < self.ttl, Arc::clone(&entry.value)));

        match lookup {
            Some((true, value)) => {
                state.hits += 1;
                debug!(key = key, "Cache hit");
                return Some(value);
            }
            Some((false, _)) => {
                state.entries.remove(key);
                debug!(key = key, "Cache entry expired");
            }
            None => debug!(key = key, "Cache miss"),
        }
        state.misses += 1;
        None
    }

    /// Store a value and return the shared handle to it
    ///
    /// When full, expired entries are dropped first, then the oldest one.
    pub fn insert(&self, key: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        if self.capacity == 0 {
            return value;
        }

        let mut state = self.lock();

        if !state.entries.contains_key(key) && state.entries.len() >= self.capacity {
            let ttl = self.ttl;
            state
                .entries
                .retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if state.entries.len() >= self.capacity {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    state.entries.remove(&oldest);
                    debug!(key = %oldest, "Cache evicted oldest entry");
                }
            }
        }

        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::clone(&value),
                inserted_at: Instant::now(),
            },
        );
        debug!(key = key, "Cache stored");
        value
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}
