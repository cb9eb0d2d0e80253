//! Shared cache handle for web applications.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::expander::CacheExpander;
use crate::query::CacheQuery;
use crate::repository::DataRepository;
use crate::store::CacheStore;
use crate::strategy::CacheStrategy;
use std::sync::{Arc, OnceLock};

/// Cheaply clonable handle to one [`CacheExpander`].
///
/// Every clone talks to the same store and the same connection.
pub struct CacheService<B: CacheBackend> {
    inner: Arc<CacheExpander<B>>,
}

impl<B: CacheBackend> Clone for CacheService<B> {
    fn clone(&self) -> Self {
        CacheService {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CacheBackend> CacheService<B> {
    pub fn new(backend: B) -> Self {
        Self::from_expander(CacheExpander::new(backend))
    }

    pub fn from_expander(expander: CacheExpander<B>) -> Self {
        CacheService {
            inner: Arc::new(expander),
        }
    }

    pub async fn connect(&self) -> Result<()> {
        self.inner.store().connect().await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.inner.store().disconnect().await
    }

    pub async fn execute<Q, R>(
        &self,
        query: &Q,
        repository: &R,
        strategy: CacheStrategy,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        self.inner.with(query, repository, strategy).await
    }

    /// Purge every cached result under `namespace` after a mutation.
    pub async fn invalidate(&self, namespace: &str) -> Result<usize> {
        self.inner.invalidate(namespace).await
    }

    pub fn expander(&self) -> &CacheExpander<B> {
        &self.inner
    }

    pub fn store(&self) -> &CacheStore<B> {
        self.inner.store()
    }

    /// True when both handles share one expander.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Process-wide create-or-get slot for one [`CacheService`].
///
/// Initialization runs at most once even when many tasks race on first use.
///
/// ```
/// use ledger_cache::backend::InMemoryBackend;
/// use ledger_cache::service::{CacheService, SharedProvider};
///
/// static CACHE: SharedProvider<InMemoryBackend> = SharedProvider::new();
///
/// assert!(!CACHE.provider_is_already_connected());
/// let a = CACHE.get_or_init(|| CacheService::new(InMemoryBackend::new()));
/// let b = CACHE.get_or_init(|| CacheService::new(InMemoryBackend::new()));
/// assert!(a.ptr_eq(b));
/// assert!(CACHE.provider_is_already_connected());
/// ```
pub struct SharedProvider<B: CacheBackend> {
    cell: OnceLock<CacheService<B>>,
}

impl<B: CacheBackend> SharedProvider<B> {
    pub const fn new() -> Self {
        SharedProvider {
            cell: OnceLock::new(),
        }
    }

    /// Return the shared service, building it with `init` on first use.
    pub fn get_or_init(&self, init: impl FnOnce() -> CacheService<B>) -> &CacheService<B> {
        self.cell.get_or_init(init)
    }

    pub fn get(&self) -> Option<&CacheService<B>> {
        self.cell.get()
    }

    /// Whether the shared instance has been constructed. This is a lifecycle
    /// flag, not a liveness check.
    pub fn provider_is_already_connected(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<B: CacheBackend> Default for SharedProvider<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "redis")]
mod redis_provider {
    use super::*;
    use crate::backend::RedisBackend;
    use crate::config::CacheConfig;

    static REDIS: SharedProvider<RedisBackend> = SharedProvider::new();

    /// Shared Redis-backed service, created from `config` on first use and
    /// connected before returning.
    ///
    /// # Errors
    ///
    /// Returns the connect error when the server cannot be reached.
    pub async fn redis_service(config: &CacheConfig) -> Result<&'static CacheService<RedisBackend>> {
        let service = REDIS.get_or_init(|| {
            CacheService::from_expander(
                CacheExpander::new(RedisBackend::new(config.redis_config()))
                    .with_ttl_policy(config.ttl_policy()),
            )
        });
        service.connect().await?;
        Ok(service)
    }

    /// Whether [`redis_service`] has constructed the shared instance.
    pub fn provider_is_already_connected() -> bool {
        REDIS.provider_is_already_connected()
    }
}

#[cfg(feature = "redis")]
pub use redis_provider::{provider_is_already_connected, redis_service};
