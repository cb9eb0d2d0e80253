//! Cache expander - read-through entry point for query use cases.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::hash::HashKeyGenerator;
use crate::key::CacheKeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::query::{self, CacheQuery};
use crate::repository::DataRepository;
use crate::serialization::{JsonCodec, ValueCodec};
use crate::store::CacheStore;
use crate::strategy::CacheStrategy;
use std::time::{Duration, Instant};

/// Read-through cache in front of a [`DataRepository`].
///
/// Query use cases call [`CacheExpander::with`]; mutation use cases call
/// [`CacheExpander::invalidate`] with the namespace they touched.
///
/// The cache is best-effort on the read-through path: under
/// `CacheStrategy::Refresh` a failing cache read falls through to the source
/// and a failing cache write is logged and ignored.
///
/// # Example
///
/// ```ignore
/// let expander = CacheExpander::new(redis_backend);
/// let query = BillQuery::bills("user_1", ListParams::page(0, 20));
///
/// let page = expander
///     .with(&query, &bill_repository, CacheStrategy::Refresh)
///     .await?;
/// ```
pub struct CacheExpander<B: CacheBackend, C: ValueCodec = JsonCodec> {
    store: CacheStore<B, C>,
    keys: &'static HashKeyGenerator,
    metrics: Box<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
}

impl<B: CacheBackend> CacheExpander<B> {
    /// Create new expander with given backend.
    pub fn new(backend: B) -> Self {
        Self::from_store(CacheStore::new(backend))
    }
}

impl<B: CacheBackend, C: ValueCodec> CacheExpander<B, C> {
    pub fn from_store(store: CacheStore<B, C>) -> Self {
        CacheExpander {
            store,
            keys: HashKeyGenerator::global(),
            metrics: Box::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    /// Create a builder for per-call strategy and TTL overrides.
    pub fn builder(&self) -> crate::builder::CacheOperationBuilder<'_, B, C> {
        crate::builder::CacheOperationBuilder::new(self)
    }

    /// Run `query` with `strategy`.
    ///
    /// Queries without a cache key (no parameters) go straight to the
    /// repository.
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: the query rejected itself
    /// - `Error::SerializationError`: the parameters could not be canonicalized
    /// - `Error::RepositoryError`: the source read failed
    /// - store errors under `Fresh` and `Invalidate`, which depend on the cache
    pub async fn with<Q, R>(
        &self,
        query: &Q,
        repository: &R,
        strategy: CacheStrategy,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        self.execute(query, repository, strategy, None).await
    }

    pub(crate) async fn execute<Q, R>(
        &self,
        query: &Q,
        repository: &R,
        strategy: CacheStrategy,
        ttl_override: Option<Duration>,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        query.validate()?;

        let namespace = query.namespace();
        let Some(cache_key) = query::cache_key(query, self.keys)? else {
            debug!("» Query in {} has no cache key, reading source", namespace);
            return repository.fetch(query).await;
        };

        let ttl = ttl_override.unwrap_or_else(|| self.ttl_policy.ttl_for(&namespace));
        debug!(
            "» Cache operation for key: {} (strategy: {})",
            cache_key, strategy
        );

        let result = match strategy {
            CacheStrategy::Fresh => self.strategy_fresh::<Q>(&cache_key).await,
            CacheStrategy::Refresh => {
                self.strategy_refresh(&cache_key, ttl, query, repository)
                    .await
            }
            CacheStrategy::Invalidate => {
                self.strategy_invalidate(&namespace, &cache_key, ttl, query, repository)
                    .await
            }
            CacheStrategy::Bypass => {
                self.strategy_bypass(&cache_key, ttl, query, repository)
                    .await
            }
        };

        if let Err(e) = &result {
            self.metrics.record_error(&cache_key, &e.to_string());
        }
        result
    }

    /// Purge every cached result under `namespace`.
    ///
    /// Returns the number of keys deleted.
    pub async fn invalidate(&self, namespace: &str) -> Result<usize> {
        let pattern = CacheKeyBuilder::pattern(namespace);
        let removed = self.store.delete_with_pattern(&pattern).await?;
        self.metrics.record_invalidation(&pattern, removed);
        Ok(removed)
    }

    /// Fresh strategy: Cache only, no repository fallback.
    async fn strategy_fresh<Q: CacheQuery>(&self, cache_key: &str) -> Result<Option<Q::Output>> {
        let timer = Instant::now();
        let cached = self.store.recover::<Q::Output>(cache_key).await?;

        match &cached {
            Some(_) => {
                debug!("✓ Cache hit (Fresh strategy)");
                self.metrics.record_hit(cache_key, timer.elapsed());
            }
            None => {
                debug!("✗ Cache miss (Fresh strategy) - no fallback");
                self.metrics.record_miss(cache_key, timer.elapsed());
            }
        }
        Ok(cached)
    }

    /// Refresh strategy: Try cache, fallback to repository on miss.
    async fn strategy_refresh<Q, R>(
        &self,
        cache_key: &str,
        ttl: Duration,
        query: &Q,
        repository: &R,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        let timer = Instant::now();
        match self.store.recover::<Q::Output>(cache_key).await {
            Ok(Some(cached)) => {
                debug!("✓ Cache hit (Refresh strategy)");
                self.metrics.record_hit(cache_key, timer.elapsed());
                return Ok(Some(cached));
            }
            Ok(None) => {
                debug!("Cache miss, falling back to repository");
                self.metrics.record_miss(cache_key, timer.elapsed());
            }
            Err(e) => {
                warn!(
                    "⚠ Cache read for {} failed, falling back to repository: {}",
                    cache_key, e
                );
                self.metrics.record_error(cache_key, &e.to_string());
            }
        }

        self.load_and_populate(cache_key, ttl, query, repository)
            .await
    }

    /// Invalidate strategy: Purge the namespace and refresh from repository.
    async fn strategy_invalidate<Q, R>(
        &self,
        namespace: &str,
        cache_key: &str,
        ttl: Duration,
        query: &Q,
        repository: &R,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        let removed = self.invalidate(namespace).await?;
        debug!("✓ Cache invalidated for {} ({} keys)", namespace, removed);

        self.load_and_populate(cache_key, ttl, query, repository)
            .await
    }

    /// Bypass strategy: Skip cache read, always hit repository.
    async fn strategy_bypass<Q, R>(
        &self,
        cache_key: &str,
        ttl: Duration,
        query: &Q,
        repository: &R,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        debug!("Bypassing cache read for {}", cache_key);
        self.load_and_populate(cache_key, ttl, query, repository)
            .await
    }

    async fn load_and_populate<Q, R>(
        &self,
        cache_key: &str,
        ttl: Duration,
        query: &Q,
        repository: &R,
    ) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        let fetched = repository.fetch(query).await?;

        if let Some(output) = &fetched {
            // Still serve the result when the cache write fails.
            if let Err(e) = self.store.save(cache_key, output, ttl).await {
                warn!("⚠ Failed to populate cache for {}: {}", cache_key, e);
            }
        }
        Ok(fetched)
    }

    /// Underlying store (for connection lifecycle and direct access).
    pub fn store(&self) -> &CacheStore<B, C> {
        &self.store
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}
