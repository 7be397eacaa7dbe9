// FICHIER : engine/src/json_db/storage/cache.rs

//! Cache LRU (Least Recently Used) thread-safe avec expiration optionnelle.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct Cache<K: Hash + Eq, V> {
    // Mutex : LruCache réordonne ses entrées à chaque `get`
    store: Arc<Mutex<LruCache<K, CacheEntry<V>>>>,
    default_ttl: Option<Duration>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(cap))),
            default_ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.store.lock().ok()?;

        let expired = match guard.get(key) {
            None => return None,
            Some(entry) => match entry.expires_at {
                Some(expires_at) if Instant::now() > expires_at => true,
                _ => return Some(entry.value.clone()),
            },
        };
        if expired {
            guard.pop(key);
        }
        None
    }

    pub fn put(&self, key: K, value: V) {
        let expires_at = self.default_ttl.map(|ttl| Instant::now() + ttl);
        if let Ok(mut guard) = self.store.lock() {
            guard.put(key, CacheEntry { value, expires_at });
        }
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut guard) = self.store.lock() {
            guard.pop(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.store.lock() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
