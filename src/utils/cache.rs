//! Memoized last-value cache.
//!
//! A small LRU keyed cache with optional TTL, shared by the business objects
//! (source and memory lookups) and the parameter store. Entries live for the
//! lifetime of the warm Lambda container.

use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use crate::utils::error::Result;

pub const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// Thread-safe LRU memo with lazy expiration.
///
/// Cloning shares the underlying store. Only hits are stored: a lookup that
/// found nothing is repeated on the next call.
#[derive(Debug, Clone)]
pub struct MemoCache<K: Hash + Eq, V> {
    store: Arc<Mutex<LruCache<K, CacheEntry<V>>>>,
    ttl: Option<Duration>,
}

impl<K: Hash + Eq + Clone, V: Clone> MemoCache<K, V> {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().await;

        match store.get(key) {
            Some(entry) if entry.is_expired() => {
                store.pop(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub async fn put(&self, key: K, value: V) {
        let mut store = self.store.lock().await;
        store.put(key, CacheEntry::new(value, self.ttl));
    }

    pub async fn invalidate(&self, key: &K) {
        let mut store = self.store.lock().await;
        store.pop(key);
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    /// Returns the cached value or runs `load` and caches a `Some` result.
    ///
    /// The lock is not held while `load` runs, so two concurrent misses on
    /// the same key both load; the last one wins.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, load: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("memo hit");
            return Ok(Some(value));
        }

        let loaded = load().await?;
        if let Some(value) = &loaded {
            self.put(key, value.clone()).await;
        }
        Ok(loaded)
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::KnowledgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_put_and_get() {
        let cache: MemoCache<String, String> = MemoCache::default();
        cache.put("app-1".to_string(), "source".to_string()).await;

        assert_eq!(
            cache.get(&"app-1".to_string()).await,
            Some("source".to_string())
        );
        assert_eq!(cache.get(&"app-2".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache: MemoCache<u32, u32> = MemoCache::new(2, None);
        cache.put(1, 10).await;
        cache.put(2, 20).await;
        // Touch 1 so that 2 becomes the least recently used.
        assert_eq!(cache.get(&1).await, Some(10));
        cache.put(3, 30).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&2).await, None);
        assert_eq!(cache.get(&1).await, Some(10));
        assert_eq!(cache.get(&3).await, Some(30));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let cache: MemoCache<u32, u32> = MemoCache::new(0, None);
        cache.put(1, 10).await;
        cache.put(2, 20).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&2).await, Some(20));
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let cache: MemoCache<u32, u32> = MemoCache::new(4, Some(Duration::from_millis(20)));
        cache.put(1, 10).await;
        assert_eq!(cache.get(&1).await, Some(10));

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get(&1).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache: MemoCache<u32, u32> = MemoCache::default();
        cache.put(1, 10).await;
        cache.invalidate(&1).await;
        assert_eq!(cache.get(&1).await, None);
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_memoizes_hits_only() {
        let cache: MemoCache<String, String> = MemoCache::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("hit".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some("value".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(value, Some("value".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for _ in 0..2 {
            let value = cache
                .get_or_try_insert_with("miss".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(value, None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_propagates_errors() {
        let cache: MemoCache<String, String> = MemoCache::default();

        let result = cache
            .get_or_try_insert_with("key".to_string(), || async {
                Err(KnowledgeError::store("boom"))
            })
            .await;

        assert!(matches!(result, Err(KnowledgeError::StoreError { .. })));
        assert!(cache.is_empty().await);
    }
}
