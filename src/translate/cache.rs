//! In-memory LRU translation cache with optional TTL.
//! Key: blake3 hash of (source_lang | target_lang | text).
//! One coarse lock per cache; these are error paths, not hot paths.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

struct CacheEntry {
    value: String,
    stored_at: Instant,
}

pub struct TranslationCache {
    inner: Mutex<LruCache<[u8; 32], CacheEntry>>,
    ttl: Option<Duration>,
}

impl TranslationCache {
    /// `ttl: None` keeps entries until LRU eviction.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be > 0"),
            )),
            ttl,
        }
    }

    /// Compute the composite cache key.
    pub fn compute_key(source: &str, target: &str, text: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.as_bytes());
        hasher.update(b"|");
        hasher.update(target.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Look up a cached translation. Side-effecting read: an entry past its
    /// TTL is removed and `None` returned.
    pub fn get(&self, key: &[u8; 32]) -> Option<String> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            match self.ttl {
                Some(ttl) if entry.stored_at.elapsed() >= ttl => {
                    cache.pop(key);
                }
                _ => return Some(entry.value.clone()),
            }
        }
        None
    }

    /// Insert a translation, evicting the least-recently-used entry at capacity.
    pub fn insert(&self, key: [u8; 32], value: String) {
        let mut cache = self.inner.lock();
        cache.put(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> [u8; 32] {
        TranslationCache::compute_key("auto", "ar", text)
    }

    #[test]
    fn round_trip() {
        let cache = TranslationCache::new(8, None);
        cache.insert(key("hello"), "مرحبا".to_string());
        assert_eq!(cache.get(&key("hello")), Some("مرحبا".to_string()));
        assert_eq!(cache.get(&key("other")), None);
    }

    #[test]
    fn distinct_language_pairs_do_not_collide() {
        let a = TranslationCache::compute_key("auto", "ar", "x");
        let b = TranslationCache::compute_key("auto", "tr", "x");
        assert_ne!(a, b);
    }

    #[test]
    fn ttl_expiry_deletes_on_get() {
        let cache = TranslationCache::new(8, Some(Duration::from_millis(20)));
        cache.insert(key("hello"), "مرحبا".to_string());
        assert!(cache.get(&key("hello")).is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&key("hello")), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let cache = TranslationCache::new(4, None);
        for i in 0..32 {
            cache.insert(key(&format!("text-{i}")), format!("value-{i}"));
            assert!(cache.len() <= 4);
        }
        // Most recent insertions survive
        assert_eq!(cache.get(&key("text-31")), Some("value-31".to_string()));
        assert_eq!(cache.get(&key("text-0")), None);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = TranslationCache::new(4, None);
        cache.insert(key("a"), "1".to_string());
        cache.insert(key("b"), "2".to_string());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key("a")), None);
    }
}
