//! Query cache keyed by resource.
//!
//! Entries hold the last server response for a [`QueryKey`]. Invalidation
//! marks entries stale without removing them; the next [`QueryCache::fetch`]
//! of a stale key goes back to the server. Invalidated resources are
//! broadcast so dependants can refetch.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use splitter_core::Resource;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Hierarchical cache key: a resource plus optional scope segments
/// (for example `expenses / <group id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub scope: Vec<String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            scope: Vec::new(),
        }
    }

    pub fn with(mut self, segment: impl ToString) -> Self {
        self.scope.push(segment.to_string());
        self
    }

    /// True when `self` equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.resource == prefix.resource && self.scope.starts_with(&prefix.scope)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resource)?;
        for segment in &self.scope {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    stale: bool,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    invalidations: HashMap<Resource, u64>,
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
    ttl: Duration,
    invalidated: broadcast::Sender<Resource>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        let (invalidated, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            ttl,
            invalidated,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key` when it is fresh, otherwise run
    /// `fetcher` and cache its result. Fetch errors leave the cache untouched.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<serde_json::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh_value(&key) {
            match serde_json::from_value(value) {
                Ok(cached) => return Ok(cached),
                Err(err) => {
                    tracing::debug!(key = %key, error = %err, "Cached value has a different shape, refetching");
                }
            }
        }

        let fetched = fetcher().await?;
        let value = serde_json::to_value(&fetched)?;
        self.store(key, value);
        Ok(fetched)
    }

    fn fresh_value(&self, key: &QueryKey) -> Option<Value> {
        let inner = self.lock();
        let entry = inner.entries.get(key)?;
        if entry.stale || entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    fn store(&self, key: QueryKey, value: Value) {
        self.lock().entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                stale: false,
            },
        );
    }

    /// Last value fetched for `key`, stale or not.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let value = self.lock().entries.get(key)?.value.clone();
        serde_json::from_value(value).ok()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.fresh_value(key).is_none()
    }

    /// Mark every entry under `resource` stale.
    pub fn invalidate(&self, resource: Resource) {
        self.invalidate_key(&QueryKey::new(resource));
    }

    /// Mark `prefix` and every entry underneath it stale.
    pub fn invalidate_key(&self, prefix: &QueryKey) {
        {
            let mut inner = self.lock();
            for (key, entry) in inner.entries.iter_mut() {
                if key.starts_with(prefix) {
                    entry.stale = true;
                }
            }
            *inner.invalidations.entry(prefix.resource).or_insert(0) += 1;
        }
        tracing::debug!(key = %prefix, "Invalidated cached queries");
        let _ = self.invalidated.send(prefix.resource);
    }

    pub fn invalidate_all(&self) {
        for resource in Resource::ALL {
            self.invalidate(resource);
        }
    }

    /// Drop every entry. Used on logout.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of invalidations recorded against `resource`.
    pub fn invalidation_count(&self, resource: Resource) -> u64 {
        self.lock()
            .invalidations
            .get(&resource)
            .copied()
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Resource> {
        self.invalidated.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expenses_for(group: &str) -> QueryKey {
        QueryKey::new(Resource::Expenses).with(group)
    }

    async fn fetch_count(cache: &QueryCache, key: QueryKey, value: u32, calls: &mut u32) -> u32 {
        cache
            .fetch::<_, serde_json::Error, _, _>(key, || {
                *calls += 1;
                async move { Ok(value) }
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_entries_are_served_from_cache() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let mut calls = 0;
        assert_eq!(fetch_count(&cache, QueryKey::new(Resource::Groups), 1, &mut calls).await, 1);
        assert_eq!(fetch_count(&cache, QueryKey::new(Resource::Groups), 2, &mut calls).await, 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn invalidated_entries_are_refetched_but_kept() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let mut calls = 0;
        fetch_count(&cache, QueryKey::new(Resource::Groups), 1, &mut calls).await;
        cache.invalidate(Resource::Groups);

        assert!(cache.contains(&QueryKey::new(Resource::Groups)));
        assert!(cache.is_stale(&QueryKey::new(Resource::Groups)));
        assert_eq!(cache.peek::<u32>(&QueryKey::new(Resource::Groups)), Some(1));

        assert_eq!(fetch_count(&cache, QueryKey::new(Resource::Groups), 2, &mut calls).await, 2);
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let mut calls = 0;
        fetch_count(&cache, QueryKey::new(Resource::Balances), 1, &mut calls).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.is_stale(&QueryKey::new(Resource::Balances)));
    }

    #[tokio::test]
    async fn resource_invalidation_reaches_scoped_keys_only_under_that_resource() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let mut calls = 0;
        fetch_count(&cache, expenses_for("g1"), 1, &mut calls).await;
        fetch_count(&cache, QueryKey::new(Resource::Settlements), 1, &mut calls).await;

        cache.invalidate(Resource::Expenses);

        assert!(cache.is_stale(&expenses_for("g1")));
        assert!(!cache.is_stale(&QueryKey::new(Resource::Settlements)));
        assert_eq!(cache.invalidation_count(Resource::Expenses), 1);
        assert_eq!(cache.invalidation_count(Resource::Settlements), 0);
    }

    #[tokio::test]
    async fn scoped_invalidation_leaves_siblings_fresh() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let mut calls = 0;
        fetch_count(&cache, expenses_for("g1"), 1, &mut calls).await;
        fetch_count(&cache, expenses_for("g2"), 1, &mut calls).await;

        cache.invalidate_key(&expenses_for("g1"));

        assert!(cache.is_stale(&expenses_for("g1")));
        assert!(!cache.is_stale(&expenses_for("g2")));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_populate() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let result = cache
            .fetch::<u32, serde_json::Error, _, _>(QueryKey::new(Resource::Groups), || async {
                Err(serde_json::from_str::<u32>("x").unwrap_err())
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.contains(&QueryKey::new(Resource::Groups)));
    }

    #[test]
    fn invalidations_are_broadcast() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let mut rx = cache.subscribe();
        cache.invalidate(Resource::Notifications);
        assert_eq!(rx.try_recv().unwrap(), Resource::Notifications);
    }

    #[test]
    fn key_display_joins_segments() {
        assert_eq!(expenses_for("g1").with("page-0").to_string(), "expenses/g1/page-0");
    }
}
