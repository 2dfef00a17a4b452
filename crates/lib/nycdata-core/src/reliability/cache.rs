use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a cached lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub data: V,
    pub cached: bool,
}

/// Stable key over an endpoint and its parameters.
///
/// `BTreeMap` iteration order makes the serialization deterministic.
#[must_use]
pub fn cache_key(endpoint: &str, params: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    for (name, value) in params {
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([b'=']);
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Entry owned by the cache; replaced, never mutated.
struct CacheEntry<V> {
    payload: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    insertion_order: VecDeque<String>,
}

impl<V> CacheState<V> {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.insertion_order.retain(|existing| existing != key);
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self.insertion_order.pop_front()?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

/// Bounded TTL cache keyed by query signature.
///
/// Expired entries are dropped when they are next read. When full, the
/// oldest-inserted entry is evicted to make room.
pub struct QueryCache<V> {
    state: RwLock<CacheState<V>>,
    capacity: usize,
}

impl<V: Clone> QueryCache<V> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            capacity,
        }
    }

    /// Returns a fresh cached payload or runs `producer` and stores its result.
    ///
    /// Producer errors are returned as-is and nothing is stored.
    ///
    /// # Errors
    /// Returns whatever error the producer returns.
    pub async fn with_cache<F, Fut, E>(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        ttl: Duration,
        producer: F,
    ) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = cache_key(endpoint, params);
        if let Some(data) = self.get(&key).await {
            debug!(endpoint, "query cache hit");
            return Ok(Cached { data, cached: true });
        }

        debug!(endpoint, "query cache miss");
        let data = producer().await?;
        self.insert(key, data.clone(), ttl).await;
        Ok(Cached {
            data,
            cached: false,
        })
    }

    /// Fetches a live entry, dropping it if it has expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.payload.clone()),
                Some(_) => {}
            }
        }

        let mut state = self.state.write().await;
        if state.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            state.remove(key);
        }
        None
    }

    pub async fn insert(&self, key: String, payload: V, ttl: Duration) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.write().await;
        state.remove(&key);
        while state.entries.len() >= self.capacity {
            let Some(evicted) = state.evict_oldest() else {
                break;
            };
            debug!(key = %evicted, "query cache evicted oldest entry");
        }
        state.insertion_order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                payload,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.insertion_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    async fn counted(
        cache: &QueryCache<usize>,
        calls: &Arc<AtomicUsize>,
        query: &BTreeMap<String, String>,
        ttl: Duration,
    ) -> Cached<usize> {
        let calls = calls.clone();
        cache
            .with_cache("erm2-nwe9", query, ttl, || async move {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .expect("producer never fails")
    }

    #[test]
    fn key_ignores_insertion_order() {
        let mut left = BTreeMap::new();
        left.insert("$where".to_string(), "borough = 'BRONX'".to_string());
        left.insert("$limit".to_string(), "10".to_string());
        let right = params(&[("$limit", "10"), ("$where", "borough = 'BRONX'")]);
        assert_eq!(cache_key("erm2-nwe9", &left), cache_key("erm2-nwe9", &right));
        assert_ne!(cache_key("erm2-nwe9", &left), cache_key("wvxf-dwi5", &left));
    }

    #[tokio::test]
    async fn second_call_within_ttl_is_served_from_cache() {
        let cache = QueryCache::new(8);
        let calls = Arc::new(AtomicUsize::new(0));
        let query = params(&[("$limit", "10")]);

        let first = counted(&cache, &calls, &query, Duration::from_secs(60)).await;
        let second = counted(&cache, &calls, &query, Duration::from_secs(60)).await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.data, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_invoke_the_producer_again() {
        let cache = QueryCache::new(8);
        let calls = Arc::new(AtomicUsize::new(0));
        let query = params(&[("$limit", "10")]);

        counted(&cache, &calls, &query, Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let again = counted(&cache, &calls, &query, Duration::from_millis(10)).await;

        assert!(!again.cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn full_cache_evicts_oldest_insertion() {
        let cache = QueryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.insert("a".to_string(), 1, ttl).await;
        cache.insert("b".to_string(), 2, ttl).await;
        assert_eq!(cache.get("a").await, Some(1));

        cache.insert("c".to_string(), 3, ttl).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn producer_errors_are_not_cached() {
        let cache: QueryCache<usize> = QueryCache::new(4);
        let query = params(&[]);
        let failed = cache
            .with_cache("x", &query, Duration::from_secs(60), || async { Err::<usize, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_capacity_disables_caching() {
        let cache = QueryCache::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let query = params(&[]);
        counted(&cache, &calls, &query, Duration::from_secs(60)).await;
        counted(&cache, &calls, &query, Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
