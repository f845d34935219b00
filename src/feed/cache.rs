use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::fetcher::FetchResponse;

/// Fallback capacity when a zero capacity is configured.
const MIN_CAPACITY: usize = 1;

/// A cached response plus the validators needed for conditional requests.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: FetchResponse,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }
}

/// Shared response cache.
///
/// Created once at service startup and handed to the fetcher; cloning the
/// handle shares the same store. The lock is never held across an await.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    inner: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl CacheHandle {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(MIN_CAPACITY)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut cache = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(key).cloned()
    }

    pub fn put(&self, key: String, entry: CacheEntry) {
        let mut cache = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.put(key, entry);
    }

    /// Marks an entry as freshly validated (after a `304 Not Modified`).
    pub fn touch(&self, key: &str) {
        let mut cache = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = cache.get_mut(key) {
            entry.stored_at = Instant::now();
        }
    }

    pub fn len(&self) -> usize {
        let cache = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key of a request: SHA-256 over method, URL and POST body.
pub fn cache_key(url: &str, post: Option<&str>) -> String {
    let input = match post {
        Some(body) => format!("POST|{url}|{body}"),
        None => format!("GET|{url}"),
    };
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
