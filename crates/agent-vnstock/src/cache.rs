//! Caching layer for vendor responses that rarely change

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Cache key for a vendor request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Vendor name, e.g. `vci`
    pub source: String,
    /// Endpoint or GraphQL operation
    pub endpoint: String,
    /// Additional parameters as JSON string
    pub params: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            source: source.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

type InFlight = std::sync::Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>;

/// TTL cache of JSON responses, shared by clones
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
    /// One fetch lock per key with a miss in progress
    in_flight: Arc<InFlight>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
            in_flight: Arc::default(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value, or run `fetcher` and cache what it returns
    ///
    /// Concurrent misses on one key wait for the first fetch instead of
    /// sending their own. Errors are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<serde_json::Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<serde_json::Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(source = %key.source, endpoint = %key.endpoint, "Cache hit");
            return Ok(value);
        }

        let lock = self.fetch_lock(&key);
        let _guard = lock.lock().await;
        if let Some(value) = self.get(&key).await {
            tracing::debug!(source = %key.source, endpoint = %key.endpoint, "Cache hit after wait");
            return Ok(value);
        }

        tracing::debug!(source = %key.source, endpoint = %key.endpoint, "Cache miss");
        let result = fetcher().await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone()).await;
        }
        self.release_fetch_lock(&key, &lock);
        result
    }

    fn fetch_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    /// Drop the entry if it still belongs to this fetch
    fn release_fetch_lock(&self, key: &CacheKey, lock: &Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, lock)) {
            in_flight.remove(key);
        }
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResponseCache {
    /// One hour; the field catalog and company listings change rarely
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_fetch_runs_fetcher_once() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = CacheKey::new("vci", "ListFinancialRatio", serde_json::json!({}));
        let catalog = serde_json::json!([{"fieldName": "pe", "en_Name": "P/E"}]);

        let mut calls = 0;
        let first = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(catalog.clone()) }
            })
            .await
            .unwrap();
        assert_eq!(first, catalog);

        let second = cache
            .get_or_fetch(key, || {
                calls += 1;
                async { Ok::<_, String>(serde_json::json!(null)) }
            })
            .await
            .unwrap();
        assert_eq!(second, catalog);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let cache = ResponseCache::new(Duration::from_secs(60));
        let key = CacheKey::new("vci", "ListFinancialRatio", serde_json::json!({}));
        let calls = AtomicUsize::new(0);

        let fetch = || {
            let cache = cache.clone();
            let key = key.clone();
            let calls = &calls;
            async move {
                cache
                    .get_or_fetch(key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(serde_json::json!(["currentRatio"]))
                    })
                    .await
            }
        };

        let (a, b, c) = tokio::join!(fetch(), fetch(), fetch());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), serde_json::json!(["currentRatio"]));
        assert_eq!(b.unwrap(), c.unwrap());
        assert!(cache.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResponseCache::default();
        let key = CacheKey::new("vci", "CompanyListingInfo", "REE");

        let failed = cache
            .get_or_fetch(key.clone(), || async { Err::<serde_json::Value, _>("HTTP 503") })
            .await;
        assert!(failed.is_err());
        assert!(cache.is_empty().await);

        let shared = cache.clone();
        shared.insert(key.clone(), serde_json::json!({"organName": "REE"})).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&key).await.unwrap()["organName"], "REE");
    }
}
