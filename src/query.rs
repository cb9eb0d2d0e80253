//! Cacheable queries.

use crate::error::Result;
use crate::hash::HashKeyGenerator;
use crate::key::CacheKeyBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A read whose result can be cached.
///
/// The cache key is `"{namespace}/{sha256(canonical(params))}"`, so two
/// queries with equal parameters share an entry however the parameters
/// were built, and a mutation can purge the whole namespace at once.
///
/// # Example
///
/// ```
/// use ledger_cache::CacheQuery;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct Paging {
///     page: u32,
///     size: u32,
/// }
///
/// #[derive(Serialize, Deserialize)]
/// struct Category {
///     id: String,
///     name: String,
/// }
///
/// struct CategoriesQuery {
///     user_id: String,
///     paging: Paging,
/// }
///
/// impl CacheQuery for CategoriesQuery {
///     type Params = Paging;
///     type Output = Vec<Category>;
///
///     fn namespace(&self) -> String {
///         format!("categories/{}", self.user_id)
///     }
///
///     fn params(&self) -> Option<&Paging> {
///         Some(&self.paging)
///     }
/// }
/// ```
pub trait CacheQuery: Send + Sync {
    /// Parameters that identify one result within the namespace.
    type Params: Serialize;

    /// Result type stored in the cache.
    type Output: Serialize + DeserializeOwned + Send + Sync;

    /// Key prefix shared by every result that one mutation invalidates,
    /// e.g. `"bills/{user_id}"`.
    fn namespace(&self) -> String;

    /// `None` means the query has no parameters to key on; it is then
    /// served straight from the source.
    fn params(&self) -> Option<&Self::Params>;

    /// Checked before any cache or source access.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Cache key for `query`, or `None` when it has no key.
pub fn cache_key<Q: CacheQuery + ?Sized>(
    query: &Q,
    generator: &HashKeyGenerator,
) -> Result<Option<String>> {
    let hash = generator.execute(query.params())?;
    Ok(hash.map(|h| CacheKeyBuilder::build(&query.namespace(), &h)))
}
