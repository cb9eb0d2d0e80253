//! Builder pattern for per-call cache options.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::serialization::ValueCodec;
use crate::strategy::CacheStrategy;
use crate::{CacheExpander, CacheQuery, DataRepository};
use std::time::Duration;

/// Fluent builder for one cache operation.
///
/// Overrides the strategy and the TTL for a single call without touching
/// the expander's configured policy. Failed operations are not retried.
///
/// # Example
///
/// ```ignore
/// let page = expander
///     .builder()
///     .with_strategy(CacheStrategy::Bypass)
///     .with_ttl(Duration::from_secs(30))
///     .execute(&query, &repo)
///     .await?;
/// ```
pub struct CacheOperationBuilder<'a, B: CacheBackend, C: ValueCodec> {
    expander: &'a CacheExpander<B, C>,
    strategy: CacheStrategy,
    ttl_override: Option<Duration>,
}

impl<'a, B: CacheBackend, C: ValueCodec> CacheOperationBuilder<'a, B, C> {
    /// Create a new builder with default settings.
    pub(crate) fn new(expander: &'a CacheExpander<B, C>) -> Self {
        Self {
            expander,
            strategy: CacheStrategy::Refresh,
            ttl_override: None,
        }
    }

    /// Set the cache strategy.
    pub fn with_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override TTL for this operation.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    /// Execute the cache operation.
    ///
    /// # Errors
    ///
    /// Same as [`CacheExpander::with`].
    pub async fn execute<Q, R>(self, query: &Q, repository: &R) -> Result<Option<Q::Output>>
    where
        Q: CacheQuery,
        R: DataRepository<Q>,
    {
        self.expander
            .execute(query, repository, self.strategy, self.ttl_override)
            .await
    }
}
