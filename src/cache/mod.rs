//! In-memory cache
//!
//! Thin wrapper over moka's async cache with a fixed time-to-live. Values are
//! stored as `Arc`s so hits are cheap to hand out.
//!
//! # Usage
//!
//! ```rust,ignore
//! use maison::cache::MemoryCache;
//!
//! let cache: MemoryCache<Vec<Product>> = MemoryCache::new(16, Duration::from_secs(300));
//! let products = cache.get_or_try_load("products", fetch_products()).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// TTL cache keyed by string
pub struct MemoryCache<V> {
    cache: Cache<String, Arc<V>>,
    ttl: Duration,
}

impl<V> std::fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<V: Send + Sync + 'static> MemoryCache<V> {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache, ttl }
    }

    /// Return the cached value, or run `load` and cache its success.
    ///
    /// Concurrent misses on the same key share one load. Failures are not cached.
    pub async fn get_or_try_load<E, F>(&self, key: &str, load: F) -> Result<Arc<V>, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.cache
            .try_get_with(key.to_string(), async move { load.await.map(Arc::new) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache: MemoryCache<String> = MemoryCache::new(10, Duration::from_secs(60));
        let a = cache
            .get_or_try_load("a", async { Ok::<_, String>("first".to_string()) })
            .await
            .unwrap();
        let b = cache
            .get_or_try_load("b", async { Ok::<_, String>("second".to_string()) })
            .await
            .unwrap();
        assert_eq!(a.as_str(), "first");
        assert_eq!(b.as_str(), "second");
    }

    #[tokio::test]
    async fn test_load_runs_once_until_expiry() {
        let cache: MemoryCache<u32> = MemoryCache::new(10, Duration::from_secs(60));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_load("n", async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: MemoryCache<u32> = MemoryCache::new(10, Duration::from_secs(60));

        let err = cache
            .get_or_try_load("n", async { Err::<u32, _>("down".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err.as_str(), "down");

        let value = cache
            .get_or_try_load("n", async { Ok::<_, String>(1) })
            .await
            .unwrap();
        assert_eq!(*value, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache: MemoryCache<u32> = MemoryCache::new(10, Duration::from_millis(50));
        let first = cache
            .get_or_try_load("n", async { Ok::<_, String>(1) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        let second = cache
            .get_or_try_load("n", async { Ok::<_, String>(2) })
            .await
            .unwrap();
        assert_eq!((*first, *second), (1, 2));
    }
}
