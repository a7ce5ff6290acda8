//! Content-addressed cache of canonicalized provider responses.
//!
//! The single most important correctness property of the pipeline lives
//! here: [`CacheManager::get_or_fetch`] guarantees at most one in-flight
//! fetch per key, so concurrent callers never issue duplicate paid
//! requests. Backing-store failures degrade to a direct fetch with a
//! warning; the cache is an optimization, never a dependency.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{CacheStoreError, SerpError};
use crate::provider::ProviderId;
use crate::types::{normalize_query, SearchParams, SerpResult};

/// Stable hash of `(provider, normalized query text, sorted params)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the cache/budget key for one unit of work.
#[must_use]
pub fn cache_key(provider: ProviderId, query: &str, params: &SearchParams) -> CacheKey {
    let canonical = format!(
        "{}\n{}\n{}",
        provider.as_str(),
        normalize_query(query),
        params.canonical()
    );
    let hash = Sha256::digest(canonical.as_bytes());
    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    CacheKey(hex)
}

/// A cached response with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: SerpResult,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Backing store for cache entries.
///
/// Implementations may fail (a remote store going away); the manager treats
/// store errors as misses and keeps serving.
pub trait CacheStore: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<CacheEntry>, CacheStoreError>> + Send;
    fn put(
        &self,
        key: &str,
        entry: CacheEntry,
    ) -> impl Future<Output = Result<(), CacheStoreError>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), CacheStoreError>> + Send;
}

/// In-process store. Infallible; exists so the manager has a default and
/// tests can swap in a failing store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheStoreError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> Result<(), CacheStoreError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheStoreError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Single-flight cache over a [`CacheStore`].
pub struct CacheManager<S = MemoryStore> {
    store: S,
    flights: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CacheManager<MemoryStore> {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl<S: CacheStore> CacheManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            flights: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry. Expired entries are lazily evicted; store
    /// errors log a warning and read as a miss.
    pub async fn get(&self, key: &CacheKey) -> Option<SerpResult> {
        match self.store.get(key.as_str()).await {
            Ok(Some(entry)) if entry.fresh(Instant::now()) => {
                let mut value = entry.value;
                value.from_cache = true;
                Some(value)
            }
            Ok(Some(_)) => {
                if let Err(e) = self.store.remove(key.as_str()).await {
                    tracing::warn!(key = %key, error = %e, "failed to evict expired cache entry");
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache store read failed; treating as miss");
                None
            }
        }
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    ///
    /// Concurrent callers for the same key block on the first caller's
    /// flight; after it completes they read its stored result instead of
    /// fetching again. If the flight fails, the next waiter in line retries
    /// the fetch itself.
    ///
    /// # Errors
    ///
    /// Propagates the error from `fetch`. Store failures are logged and
    /// degrade to a direct fetch; they are never surfaced.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<SerpResult, SerpError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SerpResult, SerpError>>,
    {
        let flight = {
            let mut flights = self.flights.lock().await;
            Arc::clone(
                flights
                    .entry(key.as_str().to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let result = {
            let _guard = flight.lock().await;
            if let Some(hit) = self.get(key).await {
                tracing::debug!(key = %key, provider = %hit.provider, "cache hit");
                Ok(hit)
            } else {
                let fetched = fetch().await;
                if let Ok(ref value) = fetched {
                    let entry = CacheEntry {
                        value: value.clone(),
                        expires_at: Instant::now() + ttl,
                    };
                    if let Err(e) = self.store.put(key.as_str(), entry).await {
                        tracing::warn!(
                            key = %key,
                            error = %e,
                            "cache store write failed; result served uncached"
                        );
                    }
                }
                fetched
            }
        };

        // Drop the flight slot once no other caller is waiting on it.
        {
            let mut flights = self.flights.lock().await;
            if Arc::strong_count(&flight) <= 2 {
                flights.remove(key.as_str());
            }
        }

        result
    }
}
