//! Expiring LRU cache for upstream authorization answers.
//!
//! Entries are keyed by a credential fingerprint and expire a fixed time
//! after insertion. Expired entries are dropped lazily on lookup. The
//! least-recently-used entry is evicted once the entry limit is reached.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;

/// Default maximum number of cached credentials.
pub const DEFAULT_AUTH_CACHE_CAPACITY: usize = 1000;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// LRU cache whose entries expire after a fixed time-to-live.
///
/// Thread-safe; share it across requests behind the authorizer that owns it.
pub struct ExpiringCache<V> {
    entries: RwLock<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache holding at most `max_entries` values for `ttl` each.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Get a live value, marking it as recently used.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;

        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        None
    }

    /// Store a value, restarting its time-to-live.
    pub async fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write().await;
        entries.put(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
